//! Basic usage example - register a device and call one of its methods by name

use callreg::{params_to_args, shared, Exported, MethodSet, Registry, Result};

#[derive(Default)]
struct Thermostat {
    target: f64,
}

impl Thermostat {
    fn set_target(&mut self, celsius: f64) -> f64 {
        std::mem::replace(&mut self.target, celsius)
    }

    fn target(&self) -> f64 {
        self.target
    }
}

impl Exported for Thermostat {
    fn type_name() -> &'static str {
        "thermostat"
    }

    fn export(methods: &mut MethodSet<Self>) {
        methods
            .method("SetTarget", Thermostat::set_target)
            .method("Target", Thermostat::target);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Method name and JSON params from args, e.g. `home.thermostat.SetTarget '[21]'`
    let mut argv = std::env::args().skip(1);
    let method = argv
        .next()
        .unwrap_or_else(|| "home.thermostat.Target".to_string());
    let params: serde_json::Value = match argv.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => serde_json::Value::Null,
    };

    let registry = Registry::with_namespace("home");
    registry.register(&[&shared(Thermostat::default())])?;

    println!("Registered methods:");
    for info in registry.describe()? {
        println!("  - {}", info.signature);
    }

    println!("Calling {} with {} argument(s)", method, params_to_args(&params)?.len());
    let result = registry.call_json(&method, &params)?;
    println!("Result: {}", result);

    Ok(())
}
