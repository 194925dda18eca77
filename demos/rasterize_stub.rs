//! Rasterize and evaluate against a local stub server standing in for Ichabod

use ichabod::{ClientConfig, RenderClient, RequestParameters};
use std::io::Read;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Ichabod client - stub example\n");

    // Answer /health and echo the output path back, like the real server does
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();

    std::thread::spawn(move || {
        for mut req in server.incoming_requests() {
            if req.url() == "/health" {
                let _ = req.respond(tiny_http::Response::from_string("ok"));
                continue;
            }
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);
            let output = url::form_urlencoded::parse(body.as_bytes())
                .find(|(k, _)| k == "output")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let reply = serde_json::json!({
                "conversion": true,
                "convert_elapsed": 2.25,
                "errors": null,
                "path": output,
                "result": null,
                "run_elapsed": 3.181,
                "warnings": null,
            });
            let _ = req.respond(tiny_http::Response::from_string(reply.to_string()));
        }
    });

    let client = RenderClient::new(ClientConfig::default().with_port(port), true)?;
    println!("Connected to {}", client.base_url());

    let rasterized =
        client.rasterize_html(RequestParameters::new().html("<h1>Hello, world!</h1>").width(105))?;
    println!("Rasterized: {}", serde_json::to_string_pretty(&rasterized)?);

    let evaluated = client.evaluate_in_html(
        RequestParameters::new()
            .html("<h1 id=t>Hello</h1>")
            .js("document.getElementById('t').textContent = 'Changed'"),
    )?;
    println!(
        "Evaluated: conversion={:?} path={:?}",
        evaluated.conversion(),
        evaluated.path()
    );

    // Reserved output files belong to the caller; the stub left them empty
    for path in [rasterized.path(), evaluated.path()].into_iter().flatten() {
        let _ = std::fs::remove_file(path);
    }
    Ok(())
}
