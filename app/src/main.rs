use deep_heating::{
    Settings,
    adapter::{
        ActionDispatcher, Poller,
        stdio::{CommandSource, JsonLinesSink, JsonLinesSource},
    },
    system::HeatingSystem,
};
use tokio::{io::BufReader, task::JoinSet};
use tokio_util::sync::CancellationToken;

#[tokio::main]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings.monitoring.init().expect("Error initializing monitoring");
    settings.home.validate().expect("Invalid home configuration");

    let poll_command = settings.system.poll_command.clone();
    let refresh_interval = settings.system.refresh_interval();

    let system = HeatingSystem::new(settings.home, settings.adjustments, settings.system);
    let mut running = system.spawn();

    let token = CancellationToken::new();
    let mut adapters = JoinSet::new();
    let output = JsonLinesSink::new(tokio::io::stdout());

    adapters.spawn(
        ActionDispatcher::new(output.clone(), running.subscribe_actions(), running.sender()).run(token.child_token()),
    );
    adapters.spawn(output.publish_state(running.subscribe_state(), token.child_token()));
    adapters.spawn(JsonLinesSource::new(BufReader::new(tokio::io::stdin()), running.sender()).run(token.child_token()));

    if let Some(command) = poll_command {
        let source = CommandSource::new(&command).expect("Invalid poll command");
        adapters.spawn(Poller::new(source, refresh_interval, running.sender()).run(token.child_token()));
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl-C, shutting down"),
        _ = running.stopped() => tracing::warn!("Heating system stopped unexpectedly"),
    }

    token.cancel();
    while adapters.join_next().await.is_some() {}

    running.shutdown().await;
}
