//! Demo loader and runner for hearth scripts.
//! Usage: hearthc <file.hearth>... [--state <path>=<value>]... [--fire <name>]
//!
//! Parses each file (a parse failure in one file does not stop the others),
//! registers everything against a scripted host, and prints the compiled
//! trigger descriptors. With `--fire`, runs the named automation once and
//! dumps the host calls it made; `--state` seeds the scripted host first.

use std::path::Path;
use std::sync::Arc;
use std::{env, fs, process};

use anyhow::{Context, Result};
use hearth_engine::{Registrar, ScriptedHost, Value};
use hearth_script::parse_file;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let mut files = Vec::new();
    let mut states = Vec::new();
    let mut fire: Option<String> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--fire" {
            fire = Some(args.next().context("--fire requires an automation name")?);
        } else if arg == "--state" {
            let spec = args.next().context("--state requires <path>=<value>")?;
            let (path, raw) = spec
                .split_once('=')
                .with_context(|| format!("--state '{spec}' is not <path>=<value>"))?;
            // JSON where it parses, bare string otherwise
            let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::Str(raw.into()));
            states.push((path.to_string(), value));
        } else {
            files.push(arg);
        }
    }
    if files.is_empty() {
        eprintln!("Usage: hearthc <file.hearth>... [--state <path>=<value>]... [--fire <name>]");
        process::exit(2);
    }

    let host = Arc::new(ScriptedHost::new());
    for (path, value) in states {
        host.put_state(path, value);
    }
    let registrar = Registrar::new(host.clone());

    for file in &files {
        let namespace = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("main")
            .to_string();
        let src = match fs::read_to_string(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{file}: unable to read: {e}");
                continue;
            },
        };
        let automations = match parse_file(&src) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("{file}: {e}");
                continue;
            },
        };
        for automation in automations {
            let name = automation.name.clone();
            match registrar.register(&namespace, automation) {
                Ok(specs) => {
                    println!("{namespace}/{name}:");
                    for spec in specs {
                        match spec.hold {
                            Some(hold) => {
                                println!("  [{:?}] {} (hold {hold}s)", spec.kind, spec.descriptor);
                            },
                            None => println!("  [{:?}] {}", spec.kind, spec.descriptor),
                        }
                    }
                },
                Err(e) => eprintln!("{namespace}/{name}: {e}"),
            }
        }
    }

    if let Some(name) = fire {
        let key = registrar
            .automations()
            .into_iter()
            .find(|(_, n)| *n == name)
            .with_context(|| format!("no automation named '{name}' registered"))?;
        let results = registrar
            .run_once(&key.0, &key.1, Value::Null)
            .await
            .with_context(|| format!("running {name}"))?;
        println!("{name}: {} result(s)", results.len());
        for call in host.calls() {
            println!("  {call:?}");
        }
    }

    Ok(())
}
