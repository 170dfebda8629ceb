use anyhow::Context;
use expdj::kernel::config::load_config;
use expdj_logger::Logger;
use expdj_server::Server;

#[expdj_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).init()?;

    let cfg = load_config(Some("server")).context("Critical: Configuration is malformed")?;

    Server::builder().config(cfg).build().await?.run().await
}
