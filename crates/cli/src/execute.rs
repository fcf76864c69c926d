use crate::commands::Commands;
use credmount_resolver::{EnvMethod, EnvVar, GetOptions, SecretResolver};
use eyre::{bail, eyre, Result};
use std::path::PathBuf;

impl Commands {
    pub fn execute(self, resolver: &SecretResolver) -> Result<()> {
        match self {
            Commands::Get {
                names,
                no_build,
                field,
            } => get(resolver, &names, no_build, field),
            Commands::Update { name, fields } => update(resolver, &name, &fields),
            Commands::Record { name } => {
                let record = resolver.vault_record(&name)?;
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(())
            }
            Commands::EnvFile {
                vars,
                method,
                output,
            } => env_file(resolver, method, &vars, output),
            Commands::Status { build } => status(resolver, build),
            Commands::Config { key } => config(resolver, key),
        }
    }
}

fn get(
    resolver: &SecretResolver,
    names: &[String],
    no_build: bool,
    field: Option<String>,
) -> Result<()> {
    let options = GetOptions {
        build: !no_build,
        search_cache: true,
    };
    let secrets = resolver.get_secrets(names, options)?;

    match field {
        Some(field) => {
            let [name] = names else {
                bail!("--field needs exactly one secret name");
            };
            let value = secrets
                .field(name, &field)
                .ok_or_else(|| eyre!("secret '{name}' has no field '{field}'"))?;
            println!("{value}");
        }
        None => println!("{}", serde_json::to_string_pretty(&secrets)?),
    }
    Ok(())
}

fn update(resolver: &SecretResolver, name: &str, fields: &[(String, String)]) -> Result<()> {
    let record = resolver.update_secret(name, fields.iter().map(|(k, v)| (k, v)))?;
    let names: Vec<&str> = record.fields().collect();
    println!("updated '{name}': {}", names.join(", "));
    Ok(())
}

fn env_file(
    resolver: &SecretResolver,
    method: EnvMethod,
    vars: &[EnvVar],
    output: Option<PathBuf>,
) -> Result<()> {
    let path = resolver.write_env_file(method, vars, output.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn status(resolver: &SecretResolver, build: bool) -> Result<()> {
    let access = if build {
        resolver.ensure_store(true)?
    } else {
        resolver.access_state()
    };
    println!("backend: {}", resolver.store().backend_name());
    println!("root: {}", resolver.store().root().display());
    println!("access: {access}");
    Ok(())
}

fn config(resolver: &SecretResolver, key: Option<String>) -> Result<()> {
    let settings = serde_json::to_value(resolver.config())?;
    let value = match key {
        Some(key) => settings
            .get(&key)
            .cloned()
            .ok_or_else(|| eyre!("unknown option '{key}'"))?,
        None => settings,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
