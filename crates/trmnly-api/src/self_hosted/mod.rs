// Self-hosted server API
//
// A rich REST surface under `/api/`: devices, screens, models, and the
// device-facing `/api/display` endpoint. Resource endpoints wrap their
// payload as `{ "data": ... }`; write bodies are wrapped by resource name.

pub mod client;
mod devices;
mod models;
mod screens;

pub use client::SelfHostedClient;
