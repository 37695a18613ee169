//! Commands that talk to a running daemon over HTTP.

use deskwell_core::Config;

fn base_url() -> Result<String, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(format!("http://127.0.0.1:{}", config.server.port))
}

pub fn status() -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/status", base_url()?);
    let resp: serde_json::Value = reqwest::blocking::get(&url)?.json()?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}

pub fn start() -> Result<(), Box<dyn std::error::Error>> {
    post("start")
}

pub fn end() -> Result<(), Box<dyn std::error::Error>> {
    post("end")
}

fn post(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/{path}", base_url()?);
    let client = reqwest::blocking::Client::new();
    let resp: serde_json::Value = client.post(&url).send()?.json()?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
