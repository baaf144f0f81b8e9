// UI module - progress events shared by the engine and the CLI

pub mod progress;
