use clap::Subcommand;
use credmount_resolver::{EnvMethod, EnvVar};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve secrets and print them as JSON
    Get {
        /// Secret names
        #[arg(required = true)]
        names: Vec<String>,

        /// Neither provision nor use the local store
        #[arg(long)]
        no_build: bool,

        /// Print only this field of a single secret
        #[arg(short, long)]
        field: Option<String>,
    },

    /// Set fields of a vault record, adding custom fields as needed
    Update {
        /// Secret name
        name: String,

        /// Fields as FIELD=VALUE
        #[arg(required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },

    /// Print the raw vault record of a secret
    Record {
        /// Secret name
        name: String,
    },

    /// Write a shell file exporting secret values
    EnvFile {
        /// Variables as NAME=secret:field[.key...]
        #[arg(required = true)]
        vars: Vec<EnvVar>,

        /// Where values come from (vault, mount)
        #[arg(long, default_value = "vault")]
        method: EnvMethod,

        /// Output file; defaults to credmount_env_vars.bash in the current directory
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show the local store backend, root and access state
    Status {
        /// Provision the local store if it is absent
        #[arg(long)]
        build: bool,
    },

    /// Show the effective settings, or a single option
    Config {
        /// Option name
        key: Option<String>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("password=a=b").unwrap(),
            ("password".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("note=").unwrap(),
            ("note".to_string(), String::new())
        );
        assert!(parse_assignment("=value").is_err());
        assert!(parse_assignment("password").is_err());
    }
}
