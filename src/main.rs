use std::env;
use std::fs;
use std::process;

use cantus::{LineInput, LineResult};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cantus <line.yaml>");
        process::exit(1);
    }

    let source = match fs::read_to_string(&args[1]) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", &args[1], e);
            process::exit(1);
        }
    };

    let input = match LineInput::from_yaml(&source) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let (notes, context, config, line_types) = input.into_parts();
    let result = cantus::parse_line_as(notes, &context, &config, &line_types);
    print_report(&result);
    if !result.is_parsed() {
        process::exit(1);
    }
}

fn print_report(result: &LineResult) {
    if !result.is_parsed() {
        println!("The line is unparseable:");
        for error in &result.errors {
            println!("  {}", error);
        }
        return;
    }
    for (number, parse) in result.parses.iter().enumerate() {
        println!(
            "Parse {} ({} line, method {}):",
            number + 1,
            parse.line_type.as_str(),
            parse.method
        );
        for note in &parse.notes {
            if !note.is_scanned() {
                continue;
            }
            let rule = note
                .rule
                .name
                .map(|r| r.as_str())
                .unwrap_or("-");
            let level = note
                .rule
                .level
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "  note {:>3}  measure {:>3}  degree {:>2}  rule {:<3} level {}",
                note.index,
                note.measure,
                note.csd.value,
                rule,
                level
            );
        }
        for arc in &parse.arcs {
            let kind = arc.kind.map(|k| k.as_str()).unwrap_or("unclassified");
            let level = arc
                .level
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "  arc {:?}  {:?}  {}  level {}",
                arc.notes, arc.category, kind, level
            );
        }
    }
}
