use clap::Args;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Args, Clone)]
pub struct Log {
	/// The level of logging written to stderr. `RUST_LOG` directives take precedence.
	#[arg(long = "log-level", env = "DIGEST_TOKEN_LOG", default_value_t = Level::WARN, global = true)]
	pub level: Level,
}

impl Log {
	pub fn level(&self) -> Level {
		self.level
	}

	// stdout is reserved for the token.
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level().into())
			.from_env_lossy();

		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.init();
	}
}
