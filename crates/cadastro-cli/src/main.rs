// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use cadastro_api::Client;
use cadastro_app::{AppState, TabKind};
use config::Config;
use runtime::{ApiRuntime, DemoRuntime};
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `cadastro --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let mut state = AppState::default();
    if !config.show_dashboard() {
        state.active_tab = TabKind::Contacts;
    }

    if options.demo {
        if options.check_only {
            return Ok(());
        }
        // demo data needs no credentials; skip straight past the sign-in screen
        state.operator = Some("demo".to_owned());
        let mut runtime = DemoRuntime::new(42);
        return cadastro_tui::run_app(&mut state, &mut runtime, config.page_size());
    }

    let mut client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    client.set_postal_base_url(config.postal_base_url())?;

    if options.check_only {
        client.ping().with_context(|| {
            format!(
                "backend at {} is unreachable -- start it or fix [server].base_url",
                config.base_url()
            )
        })?;
        return Ok(());
    }

    let remembered_path = options
        .config_path
        .parent()
        .map(|dir| dir.join("remembered_email"))
        .unwrap_or_else(|| PathBuf::from("remembered_email"));

    let mut runtime = ApiRuntime::new(client, config.lookup_enabled(), remembered_path);
    cadastro_tui::run_app(&mut state, &mut runtime, config.page_size())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        demo: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("cadastro");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with local fixture data (no backend)");
    println!("  --check                  Validate config and backend reachability");
    println!("  --help                   Show this help");
}
