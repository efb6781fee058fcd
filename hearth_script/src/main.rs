//! CLI entry point for hearth_script.
//! Usage: cargo run -p hearth_script -- check scripts/morning.hearth

use std::{env, fs, process};

use hearth_script::parse_file;

fn main() {
    let args: Vec<String> = env::args().collect();

    let rest: Vec<String> = match args.as_slice() {
        [_, flag, cmd, tail @ ..] if flag == "--" && (cmd == "check" || cmd == "dump") => {
            let mut v = vec![cmd.clone()];
            v.extend_from_slice(tail);
            v
        },
        [_, cmd, tail @ ..] if cmd == "check" || cmd == "dump" => {
            let mut v = vec![cmd.clone()];
            v.extend_from_slice(tail);
            v
        },
        _ => {
            eprintln!("Usage:\n  hearth_script check <file.hearth>\n  hearth_script dump <file.hearth>");
            process::exit(2);
        },
    };

    let cmd = &rest[0];
    if rest.len() < 2 {
        eprintln!("{cmd} requires a file path");
        process::exit(2);
    }
    let path = &rest[1];
    let src = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: unable to read '{path}': {e}");
        process::exit(1);
    });
    let autos = parse_file(&src).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    if cmd == "check" {
        for a in &autos {
            println!(
                "{}: {} trigger(s), {} action statement(s)",
                a.name,
                a.triggers.len(),
                a.actions.len()
            );
        }
        println!("ok");
    } else {
        for a in &autos {
            println!("{a:#?}");
        }
    }
}
