use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use fitlog_core::plugin::RemoteModuleHost;

use crate::remote_loader::ConsoleMount;

use super::helpers::print_json;

pub(crate) fn cmd_remote_list(host: &RemoteModuleHost, json: bool) -> Result<()> {
    let registry = host.registry();
    let remotes: Vec<(String, String, String)> = registry
        .remotes()
        .iter()
        .map(|r| {
            (
                r.name.clone(),
                registry.entry_url(&r.name).unwrap_or_default(),
                host.state(&r.name).label().to_string(),
            )
        })
        .collect();

    if json {
        let value: Vec<_> = remotes
            .iter()
            .map(|(name, url, state)| serde_json::json!({ "name": name, "url": url, "state": state }))
            .collect();
        return print_json(&value);
    }

    #[derive(Tabled)]
    struct RemoteRow {
        #[tabled(rename = "Remote")]
        name: String,
        #[tabled(rename = "Manifest")]
        url: String,
    }
    let rows: Vec<RemoteRow> = remotes
        .into_iter()
        .map(|(name, url, _)| RemoteRow { name, url })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

/// Load a remote. With `retry`, the user has asked for one more attempt after a failure.
pub(crate) async fn cmd_remote_load(
    host: &RemoteModuleHost,
    name: &str,
    retry: bool,
    json: bool,
) -> Result<()> {
    let mut result = host.load(name).await;
    if result.is_err() && retry {
        eprintln!("Load failed, retrying {name}...");
        result = host.retry(name).await;
    }
    let factory = result?;

    let mut mount = ConsoleMount::new(!json);
    factory.instantiate(&mut mount)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "remote": factory.remote_name,
                "module": factory.exposed_module,
                "url": factory.module_url,
                "state": host.state(name).label(),
            })
        );
    }
    Ok(())
}
