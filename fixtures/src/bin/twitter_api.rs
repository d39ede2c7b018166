use clap::Parser;
use fixtures::{run_server, twitter::TwitterFixture, FixtureArgs};

/// Twitter API fixture server
#[derive(Parser, Debug)]
#[clap(name = "twitter-api-fixture")]
struct Cli {
    #[clap(flatten)]
    common: FixtureArgs,

    /// Answer `/2/users/me` without a user, as if the account had no username
    #[arg(long)]
    anonymous_me: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let mut fixture = TwitterFixture::new();
    if args.anonymous_me {
        fixture = fixture.without_me();
    }

    run_server(args.common, fixture.router()).await
}
