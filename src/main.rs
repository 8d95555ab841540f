use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use jstmpl::config::SettingsFile;
use jstmpl::template::Compiler;
use jstmpl::{Engine, Settings, SettingsOverride, TemplateError, Value, logging};
use std::fs;
use std::io::{self, Read, Write};

#[derive(Parser)]
#[command(
    name = "jstmpl",
    version,
    about = "Render plain-text templates with embedded script directives"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log compile and render details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template with JSON data
    Render {
        /// Template file, or `-` to read standard input
        #[arg()]
        template: Utf8PathBuf,

        /// JSON file with the template data (default: `{}`)
        #[arg(short, long)]
        data: Option<Utf8PathBuf>,

        /// JSON settings file (delimiters, debug)
        #[arg(short, long)]
        settings: Option<Utf8PathBuf>,

        /// Fail on render errors instead of printing nothing
        #[arg(long)]
        debug: bool,

        /// Disable `<% %>` evaluate directives
        #[arg(long)]
        no_evaluate: bool,

        /// Print the template's function source instead of rendering
        #[arg(long)]
        source: bool,

        /// Output file (default: standard output)
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Compile templates and report syntax errors
    Check {
        /// Template files
        #[arg(required = true)]
        templates: Vec<Utf8PathBuf>,

        /// JSON settings file (delimiters)
        #[arg(short, long)]
        settings: Option<Utf8PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    install_miette_hook();

    let cli = Cli::parse();
    logging::init_standard_tracing(cli.verbose);

    match cli.command {
        Command::Render {
            template,
            data,
            settings,
            debug,
            no_evaluate,
            source,
            output,
        } => {
            let mut overrides = load_overrides(settings.as_deref())?;
            if debug {
                overrides.debug = Some(true);
            }
            if no_evaluate {
                overrides.evaluate = Some(None);
            }
            let engine = Engine::new(Settings::default().merged(Some(&overrides)));

            let (name, text) = read_template(&template)?;
            let prepared = engine
                .prepare_named(&name, &text, None)
                .map_err(|e| report(e, &name))?;

            let rendered = if source {
                prepared.template().function_source().to_string()
            } else {
                let data = match data {
                    Some(path) => load_data(&path)?,
                    None => Value::object::<&str, Value, _>([]),
                };
                prepared.render(&data).map_err(|e| report(e, &name))?
            };

            write_output(output.as_deref(), &rendered)?;
        }
        Command::Check {
            templates,
            settings,
        } => {
            let overrides = load_overrides(settings.as_deref())?;
            let settings = Settings::default().merged(Some(&overrides));

            for path in &templates {
                let (name, text) = read_template(path)?;
                let compiled = Compiler::new(&settings)
                    .with_name(name.as_str())
                    .compile(&text)
                    .map_err(|e| report(e, &name))?;
                println!("ok  {name} ({} statements)", compiled.program().body.len());
            }
        }
    }

    Ok(())
}

fn install_miette_hook() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if already set
}

/// Print a template error as a miette report and turn it into an eyre error
fn report(err: TemplateError, name: &str) -> color_eyre::Report {
    eprintln!("{:?}", miette::Report::new(err));
    eyre!("template {name} failed")
}

fn load_overrides(path: Option<&Utf8Path>) -> Result<SettingsOverride> {
    Ok(match path {
        Some(path) => SettingsFile::load(path)?.into_override(),
        None => SettingsOverride::new(),
    })
}

/// Read a template file, or standard input for `-`
fn read_template(path: &Utf8Path) -> Result<(String, String)> {
    if path == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .wrap_err("failed to read template from stdin")?;
        return Ok(("<stdin>".to_string(), text));
    }
    let text = fs::read_to_string(path).wrap_err_with(|| format!("failed to read {path}"))?;
    Ok((path.to_string(), text))
}

fn load_data(path: &Utf8Path) -> Result<Value> {
    let json = fs::read_to_string(path).wrap_err_with(|| format!("failed to read {path}"))?;
    let data: serde_json::Value =
        serde_json::from_str(&json).wrap_err_with(|| format!("invalid JSON in {path}"))?;
    Ok(Value::from(data))
}

fn write_output(path: Option<&Utf8Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text).wrap_err_with(|| format!("failed to write {path}")),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}
