// UI layer: a simple interactive menu using `dialoguer`. Each entry asks
// for its inputs and calls one `ApiClient` operation. Connection failures
// never come back here: the client's error handler exits the process.

use crate::api::ApiClient;
use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use std::path::PathBuf;

/// Main interactive menu. Runs a select loop until the user chooses "Exit".
pub fn main_menu(api: &ApiClient) -> Result<()> {
    let items = vec![
        "Get JSON",
        "Get plain text",
        "Post JSON",
        "Delete",
        "Upload file",
        "Download file",
        "Exit",
    ];
    loop {
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome = match selection {
            0 => handle_get_json(api),
            1 => handle_get_plain(api),
            2 => handle_post(api),
            3 => handle_delete(api),
            4 => handle_upload(api),
            5 => handle_download(api),
            _ => break,
        };
        if let Err(e) = outcome {
            println!("{} failed: {:#}", items[selection], e);
        }
    }
    Ok(())
}

fn prompt_path() -> Result<String> {
    let path: String = Input::new().with_prompt("API path").interact_text()?;
    Ok(path)
}

fn handle_get_json(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    println!("{}", api.get_json(&path)?);
    Ok(())
}

fn handle_get_plain(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    print!("{}", api.get_plain(&path)?);
    Ok(())
}

/// Reads a JSON document from the prompt, posts it and shows the status
/// together with whatever the server answered.
fn handle_post(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    let raw: String = Input::new().with_prompt("JSON body").interact_text()?;
    let body: serde_json::Value = serde_json::from_str(&raw).context("Body is not valid JSON")?;
    let res = api.post(&path, body)?;
    let status = res.status();
    let txt = api.read_text(res)?;
    println!("{}\n{}", status, txt);
    Ok(())
}

fn handle_delete(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    println!("{}", api.delete(&path)?);
    Ok(())
}

fn handle_upload(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    let field: String = Input::new()
        .with_prompt("Form field name")
        .default("file".into())
        .interact_text()?;
    let file: String = Input::new().with_prompt("Local file").interact_text()?;
    let mime: String = Input::new()
        .with_prompt("Mime type")
        .default("application/octet-stream".into())
        .interact_text()?;
    println!("{}", api.upload(&path, &field, &PathBuf::from(file), &mime)?);
    Ok(())
}

fn handle_download(api: &ApiClient) -> Result<()> {
    let path = prompt_path()?;
    let file: String = Input::new().with_prompt("Save as").interact_text()?;
    api.download(&path, &PathBuf::from(file))?;
    Ok(())
}
