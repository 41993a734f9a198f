use crate::config::{
    AuthConfig, AuthType, CliConfig, ConfigStore, ServerProfile, DEFAULT_DATABASE, DEFAULT_HOST,
    DEFAULT_PORT, DEFAULT_TENANT,
};
use crate::utils::{validate_host, CliError, UtilsError};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;
use std::io::{IsTerminal, Write};

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[clap(help = "Short name for the server")]
    alias: String,
    #[clap(long, help = "Hostname, FQDN or IPv4 address, without a port")]
    host: Option<String>,
    #[clap(long, help = "Port the server listens on")]
    port: Option<u16>,
    #[clap(long, help = "Connect over HTTPS")]
    secure: bool,
    #[clap(long, default_value = DEFAULT_TENANT, help = "Default tenant for this server")]
    tenant: String,
    #[clap(long, default_value = DEFAULT_DATABASE, help = "Default database for this server")]
    database: String,
    #[clap(long = "auth-type", value_enum, default_value_t = AuthType::None)]
    auth_type: AuthType,
    #[clap(long, help = "Credential for the selected auth type")]
    credential: Option<String>,
    #[clap(long, help = "Replace an existing server with the same alias")]
    overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    alias: String,
}

#[derive(Args, Debug, Clone)]
pub struct UseArgs {
    alias: String,
    #[clap(long, help = "Tenant to use with this server")]
    tenant: Option<String>,
    #[clap(long, help = "Database to use with this server")]
    database: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    #[clap(about = "Add a server")]
    Add(AddArgs),
    #[clap(about = "List configured servers", visible_alias = "ls")]
    List,
    #[clap(about = "Remove a server", visible_alias = "rm")]
    Remove(RemoveArgs),
}

fn prompt_host_and_port(port: Option<u16>) -> Result<(String, u16), CliError> {
    let theme = ColorfulTheme::default();
    let host: String = Input::with_theme(&theme)
        .with_prompt("Host")
        .default(DEFAULT_HOST.to_string())
        .interact_text()
        .map_err(|_| UtilsError::UserInputFailed)?;
    let port = match port {
        Some(port) => port,
        None => Input::with_theme(&theme)
            .with_prompt("Port")
            .default(DEFAULT_PORT)
            .interact_text()
            .map_err(|_| UtilsError::UserInputFailed)?,
    };
    Ok((host, port))
}

/// Builds the profile for `server add`. `prompt` is only consulted when no host was given.
fn server_profile<P>(args: &AddArgs, prompt: P) -> Result<ServerProfile, CliError>
where
    P: FnOnce(Option<u16>) -> Result<(String, u16), CliError>,
{
    let (host, port) = match &args.host {
        Some(host) => (host.clone(), args.port.unwrap_or(DEFAULT_PORT)),
        None => prompt(args.port)?,
    };
    validate_host(&host)?;

    let auth = match (args.auth_type, &args.credential) {
        (AuthType::None, _) => None,
        (auth_type, Some(credential)) => Some(AuthConfig {
            auth_type,
            credential: credential.clone(),
        }),
        (auth_type, None) => return Err(UtilsError::MissingCredential(auth_type).into()),
    };

    Ok(ServerProfile {
        host,
        port,
        secure: args.secure,
        tenant: args.tenant.clone(),
        database: args.database.clone(),
        auth,
    })
}

fn add<W: Write, C: ConfigStore + ?Sized, P>(
    writer: &mut W,
    store: &C,
    args: AddArgs,
    prompt: P,
) -> Result<(), CliError>
where
    P: FnOnce(Option<u16>) -> Result<(String, u16), CliError>,
{
    let mut config = store.load()?;
    let profile = server_profile(&args, prompt)?;
    let endpoint = profile.endpoint();
    config.add_server(&args.alias, profile, args.overwrite)?;
    store.write(&config)?;

    let message = format!("Server '{}' added ({})", args.alias, endpoint);
    writeln!(writer, "{}", message.green())?;
    if config.active_server.as_deref() == Some(args.alias.as_str()) {
        writeln!(writer, "Active server set to '{}'", args.alias)?;
    }
    Ok(())
}

fn list<W: Write>(writer: &mut W, config: &CliConfig) -> Result<(), CliError> {
    if config.servers.is_empty() {
        writeln!(
            writer,
            "No servers configured. Add one with {}",
            "chromactl server add <alias> --host <host>".yellow()
        )?;
        return Ok(());
    }

    writeln!(writer, "{}", "Servers:".blue().bold())?;
    for (alias, profile) in &config.servers {
        if config.active_server.as_deref() == Some(alias.as_str()) {
            let label = format!("{} {} (active)", alias, profile.endpoint()).bold();
            writeln!(writer, "{} {}", ">".yellow(), label)?;
        } else {
            writeln!(writer, "{} {} {}", ">".yellow(), alias, profile.endpoint())?;
        }
    }
    Ok(())
}

fn remove<W: Write, C: ConfigStore + ?Sized>(
    writer: &mut W,
    store: &C,
    args: RemoveArgs,
) -> Result<(), CliError> {
    let mut config = store.load()?;
    config.remove_server(&args.alias)?;
    store.write(&config)?;
    let message = format!("Server '{}' removed", args.alias);
    writeln!(writer, "{}", message.green())?;
    Ok(())
}

pub fn server_command<W: Write, C: ConfigStore + ?Sized>(
    writer: &mut W,
    store: &C,
    command: ServerCommand,
) -> Result<(), CliError> {
    match command {
        ServerCommand::Add(args) => {
            let interactive = std::io::stdin().is_terminal();
            add(writer, store, args, |port| {
                if interactive {
                    prompt_host_and_port(port)
                } else {
                    Ok((DEFAULT_HOST.to_string(), port.unwrap_or(DEFAULT_PORT)))
                }
            })
        }
        ServerCommand::List => list(writer, &store.load()?),
        ServerCommand::Remove(args) => remove(writer, store, args),
    }
}

pub fn use_command<W: Write, C: ConfigStore + ?Sized>(
    writer: &mut W,
    store: &C,
    args: UseArgs,
) -> Result<(), CliError> {
    let mut config = store.load()?;
    config.use_server(&args.alias, args.tenant, args.database)?;
    store.write(&config)?;

    let target = config.target(None)?;
    let message = format!(
        "Using server '{}' (tenant '{}', database '{}')",
        target.alias, target.tenant, target.database
    );
    writeln!(writer, "{}", message.green())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{profile, MemoryConfigStore};
    use crate::config::ConfigError;
    use std::io::Cursor;

    fn add_args(alias: &str, host: Option<&str>) -> AddArgs {
        AddArgs {
            alias: alias.to_string(),
            host: host.map(str::to_string),
            port: None,
            secure: false,
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            auth_type: AuthType::None,
            credential: None,
            overwrite: false,
        }
    }

    fn no_prompt(_: Option<u16>) -> Result<(String, u16), CliError> {
        panic!("prompt should not be called when a host is given")
    }

    fn output(cursor: Cursor<Vec<u8>>) -> String {
        String::from_utf8(cursor.into_inner()).unwrap()
    }

    #[test]
    fn test_add_first_server() {
        let store = MemoryConfigStore::default();
        let mut out = Cursor::new(Vec::new());

        add(&mut out, &store, add_args("local", Some("localhost")), no_prompt).unwrap();

        let result = output(out);
        assert!(result.contains("Server 'local' added (http://localhost:8000)"));
        assert!(result.contains("Active server set to 'local'"));
        let config = store.snapshot();
        assert_eq!(config.active_server.as_deref(), Some("local"));
        assert_eq!(config.servers["local"], profile("localhost"));
    }

    #[test]
    fn test_add_rejects_invalid_host() {
        let store = MemoryConfigStore::default();
        let mut out = Cursor::new(Vec::new());

        let err = add(&mut out, &store, add_args("bad", Some("localhost:8080")), no_prompt)
            .unwrap_err();

        assert!(matches!(err, CliError::Utils(UtilsError::InvalidHost(_))));
        assert_eq!(*store.writes.borrow(), 0);
    }

    #[test]
    fn test_add_existing_alias() {
        let store = MemoryConfigStore::default();
        let mut out = Cursor::new(Vec::new());
        add(&mut out, &store, add_args("prod", Some("db.example.com")), no_prompt).unwrap();

        let err = add(&mut out, &store, add_args("prod", Some("other.example.com")), no_prompt)
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::ServerAlreadyExists(_))
        ));

        let mut args = add_args("prod", Some("other.example.com"));
        args.overwrite = true;
        add(&mut out, &store, args, no_prompt).unwrap();
        assert_eq!(store.snapshot().servers["prod"].host, "other.example.com");
    }

    #[test]
    fn test_add_with_auth() {
        let store = MemoryConfigStore::default();
        let mut out = Cursor::new(Vec::new());

        let mut args = add_args("cloud", Some("api.trychroma.com"));
        args.auth_type = AuthType::XToken;
        args.secure = true;
        args.port = Some(443);
        let err = add(&mut out, &store, args.clone(), no_prompt).unwrap_err();
        assert!(matches!(
            err,
            CliError::Utils(UtilsError::MissingCredential(AuthType::XToken))
        ));

        args.credential = Some("ck-123".to_string());
        add(&mut out, &store, args, no_prompt).unwrap();
        let server = store.snapshot().servers["cloud"].clone();
        assert_eq!(server.endpoint(), "https://api.trychroma.com:443");
        assert_eq!(
            server.auth,
            Some(AuthConfig {
                auth_type: AuthType::XToken,
                credential: "ck-123".to_string(),
            })
        );
    }

    #[test]
    fn test_add_prompts_without_host() {
        let store = MemoryConfigStore::default();
        let mut out = Cursor::new(Vec::new());

        add(&mut out, &store, add_args("lab", None), |port| {
            assert_eq!(port, None);
            Ok(("lab-box".to_string(), 9000))
        })
        .unwrap();

        let server = store.snapshot().servers["lab"].clone();
        assert_eq!(server.host, "lab-box");
        assert_eq!(server.port, 9000);
    }

    #[test]
    fn test_list_and_remove() {
        let mut config = CliConfig::default();
        config
            .add_server("local", profile("localhost"), false)
            .unwrap();
        config
            .add_server("prod", profile("db.example.com"), false)
            .unwrap();
        let store = MemoryConfigStore::with(config);

        let mut out = Cursor::new(Vec::new());
        list(&mut out, &store.load().unwrap()).unwrap();
        let result = output(out);
        assert!(result.contains("local http://localhost:8000 (active)"));
        assert!(result.contains("prod http://db.example.com:8000"));

        let mut out = Cursor::new(Vec::new());
        remove(
            &mut out,
            &store,
            RemoveArgs {
                alias: "local".to_string(),
            },
        )
        .unwrap();
        assert!(output(out).contains("Server 'local' removed"));
        assert_eq!(store.snapshot().active_server, None);

        let mut out = Cursor::new(Vec::new());
        let err = remove(
            &mut out,
            &store,
            RemoveArgs {
                alias: "local".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::ServerNotFound(_))));
    }

    #[test]
    fn test_list_empty() {
        let mut out = Cursor::new(Vec::new());
        list(&mut out, &CliConfig::default()).unwrap();
        assert!(output(out).contains("No servers configured"));
    }

    #[test]
    fn test_use_server() {
        let mut config = CliConfig::default();
        config
            .add_server("local", profile("localhost"), false)
            .unwrap();
        config
            .add_server("prod", profile("db.example.com"), false)
            .unwrap();
        let store = MemoryConfigStore::with(config);

        let mut out = Cursor::new(Vec::new());
        use_command(
            &mut out,
            &store,
            UseArgs {
                alias: "prod".to_string(),
                tenant: Some("acme".to_string()),
                database: None,
            },
        )
        .unwrap();

        assert!(output(out)
            .contains("Using server 'prod' (tenant 'acme', database 'default_database')"));
        let config = store.snapshot();
        assert_eq!(config.active_server.as_deref(), Some("prod"));
        assert_eq!(config.active_tenant.as_deref(), Some("acme"));

        let mut out = Cursor::new(Vec::new());
        let err = use_command(
            &mut out,
            &store,
            UseArgs {
                alias: "missing".to_string(),
                tenant: None,
                database: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::ServerNotFound(_))));
    }
}
