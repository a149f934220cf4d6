use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use chaml_core::{Interpreter, OptionValue, Options, Value, compile};
use clap::Parser;
use serde::Deserialize;
use walkdir::WalkDir;

/// Compile Haml templates into HTML.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Template file or directory of *.haml files (reads stdin when absent)"
    )]
    input: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Output file, or directory for directory input (writes stdout when absent)"
    )]
    output: Option<PathBuf>,

    #[arg(long, value_name = "FORMAT", help = "Output format: html4, html5, xhtml")]
    format: Option<String>,

    #[arg(long, help = "Escape free text and inline tag content")]
    escape_html: bool,

    #[arg(long, value_name = "COLUMNS", help = "Columns per indentation level")]
    indent: Option<i64>,

    #[arg(long, value_name = "PATH", help = "TOML file with options and a [locals] table")]
    config: Option<PathBuf>,

    #[arg(
        long = "var",
        value_name = "NAME=VALUE",
        value_parser = parse_var,
        help = "Define a string local visible to templates (repeatable)"
    )]
    vars: Vec<(String, String)>,
}

/// Config file schema: option keys at the top level plus template locals.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    locals: BTreeMap<String, toml::Value>,
    #[serde(flatten)]
    options: BTreeMap<String, toml::Value>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };
    let options = build_options(&cli, &config)?;
    let interpreter = build_interpreter(&cli, &config);
    log::debug!("compiling with {options:?}");

    match &cli.input {
        Some(input) if input.is_dir() => {
            let output = cli
                .output
                .as_ref()
                .ok_or_else(|| anyhow!("directory input requires --output <DIR>"))?;
            compile_tree(input, output, &options, &interpreter)
        }
        Some(input) => {
            let source = fs::read_to_string(input)
                .with_context(|| format!("failed to read input file {}", input.display()))?;
            let html = compile(&source, &options, &mut interpreter.clone())
                .with_context(|| format!("failed to compile {}", input.display()))?;
            write_output(cli.output.as_deref(), &html)
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("failed to read stdin")?;
            let html = compile(&source, &options, &mut interpreter.clone())
                .context("failed to compile stdin")?;
            write_output(cli.output.as_deref(), &html)
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

fn load_config(path: &Path) -> Result<ConfigFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config file {}", path.display()))
}

fn build_options(cli: &Cli, config: &ConfigFile) -> Result<Options> {
    let mut pairs = Vec::new();
    for (key, value) in &config.options {
        pairs.push((key.clone(), option_value(key, value)?));
    }
    if let Some(format) = &cli.format {
        pairs.push(("format".to_string(), OptionValue::from(format.as_str())));
    }
    if cli.escape_html {
        pairs.push(("escape_html".to_string(), OptionValue::Bool(true)));
    }
    if let Some(indent) = cli.indent {
        pairs.push(("default_indent_depth".to_string(), OptionValue::Int(indent)));
    }
    Ok(Options::from_pairs(pairs)?)
}

fn option_value(key: &str, value: &toml::Value) -> Result<OptionValue> {
    Ok(match value {
        toml::Value::String(text) => OptionValue::Str(text.clone()),
        toml::Value::Boolean(flag) => OptionValue::Bool(*flag),
        toml::Value::Integer(number) => OptionValue::Int(*number),
        other => bail!("option `{key}` has unsupported value {other}"),
    })
}

fn build_interpreter(cli: &Cli, config: &ConfigFile) -> Interpreter {
    let mut interpreter = Interpreter::new();
    for (name, value) in &config.locals {
        interpreter.set_local(name.clone(), local_value(value));
    }
    for (name, value) in &cli.vars {
        interpreter.set_local(name.clone(), value.clone());
    }
    interpreter
}

fn local_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::Str(text.clone()),
        toml::Value::Integer(number) => Value::Int(*number),
        toml::Value::Float(number) => Value::Float(*number),
        toml::Value::Boolean(flag) => Value::Bool(*flag),
        toml::Value::Datetime(datetime) => Value::Str(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(local_value).collect()),
        toml::Value::Table(table) => Value::Map(
            table
                .iter()
                .map(|(key, value)| (key.clone(), local_value(value)))
                .collect(),
        ),
    }
}

/// Compiles every `*.haml` file under `input` into `output`, keeping the
/// relative layout and swapping the extension for `.html`.
fn compile_tree(
    input: &Path,
    output: &Path,
    options: &Options,
    interpreter: &Interpreter,
) -> Result<()> {
    let mut compiled = 0;
    for entry in WalkDir::new(input).into_iter().filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if !(path.is_file() && path.extension().is_some_and(|ext| ext == "haml")) {
            continue;
        }
        let relative = path.strip_prefix(input).unwrap_or(path);
        let target = output.join(relative).with_extension("html");

        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?;
        let html = compile(&source, options, &mut interpreter.clone())
            .with_context(|| format!("failed to compile {}", path.display()))?;
        write_output(Some(target.as_path()), &html)?;
        log::info!("{} -> {}", path.display(), target.display());
        compiled += 1;
    }
    log::debug!("compiled {compiled} templates");
    Ok(())
}

fn write_output(path: Option<&Path>, html: &str) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(html.as_bytes())
            .context("failed to write stdout")?;
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    fs::write(path, html)
        .with_context(|| format!("failed to write output file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    fn chaml() -> Command {
        Command::cargo_bin("chaml").expect("binary exists")
    }

    #[test]
    fn compiles_stdin_to_stdout() {
        chaml()
            .write_stdin("%div\n  %p hello\n")
            .assert()
            .success()
            .stdout("<div>\n  <p>hello</p>\n</div>\n");
    }

    #[test]
    fn compiles_a_file_with_format_flag() {
        let dir = tempdir().expect("tempdir");
        let input_path = dir.path().join("page.haml");
        fs::write(&input_path, "!!!\n%br\n").expect("write input");
        let output_path = dir.path().join("out/page.html");

        chaml()
            .arg("--input")
            .arg(&input_path)
            .arg("--output")
            .arg(&output_path)
            .arg("--format")
            .arg("xhtml")
            .assert()
            .success();

        let html = fs::read_to_string(&output_path).expect("output was written");
        assert!(html.starts_with("<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\""));
        assert!(html.ends_with("<br />\n"));
    }

    #[test]
    fn vars_become_string_locals() {
        chaml()
            .args(["--var", "name=World"])
            .write_stdin("%p= \"Hello, #{name}\"\n")
            .assert()
            .success()
            .stdout("<p>Hello, World</p>\n");
    }

    #[test]
    fn config_file_sets_options_and_locals() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("chaml.toml");
        fs::write(
            &config_path,
            "escape_html = true\n\n[locals]\ntitle = \"<T>\"\ncount = 2\n",
        )
        .expect("write config");

        chaml()
            .arg("--config")
            .arg(&config_path)
            .write_stdin("= title\n= count * 2\n")
            .assert()
            .success()
            .stdout("&lt;T&gt;\n4\n");
    }

    #[test]
    fn compiles_directories_recursively() {
        let dir = tempdir().expect("tempdir");
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).expect("create input tree");
        fs::write(src.join("index.haml"), "%h1 top\n").expect("write input");
        fs::write(src.join("nested/child.haml"), "%h2 inner\n").expect("write input");
        fs::write(src.join("notes.txt"), "ignored\n").expect("write input");
        let out = dir.path().join("out");

        chaml()
            .arg("--input")
            .arg(&src)
            .arg("--output")
            .arg(&out)
            .assert()
            .success();

        assert_eq!(
            fs::read_to_string(out.join("index.html")).expect("index.html"),
            "<h1>top</h1>\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("nested/child.html")).expect("child.html"),
            "<h2>inner</h2>\n"
        );
        assert!(!out.join("notes.html").exists());
    }

    #[test]
    fn reports_compile_errors() {
        chaml()
            .write_stdin(":nope\n  body\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("filter `nope` is not defined"));
    }

    #[test]
    fn rejects_unknown_config_options() {
        let dir = tempdir().expect("tempdir");
        let config_path = dir.path().join("chaml.toml");
        fs::write(&config_path, "colour = \"blue\"\n").expect("write config");

        chaml()
            .arg("--config")
            .arg(&config_path)
            .write_stdin("%p\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown option `colour`"));
    }

    #[test]
    fn var_flags_need_a_name_and_value() {
        assert_eq!(
            parse_var("a=b=c"),
            Ok(("a".to_string(), "b=c".to_string()))
        );
        assert!(parse_var("missing").is_err());
        assert!(parse_var("=value").is_err());
    }
}
