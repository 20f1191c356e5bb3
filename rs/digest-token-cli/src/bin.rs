mod config;
mod log;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use digest_token::{Algorithm, TokenBuilder};

use config::*;

#[derive(Parser, Clone)]
#[command(name = "digest-token", version, about = "Generate and validate digest tokens")]
pub struct Cli {
	#[command(flatten)]
	log: log::Log,

	/// Read credentials from this TOML file. Flags and environment variables take precedence.
	#[arg(long, global = true, env = "DIGEST_TOKEN_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
	/// Sign a new token and print it to stdout.
	Sign {
		#[command(flatten)]
		credentials: Credentials,

		#[command(flatten)]
		claims: ClaimsArgs,
	},

	/// Verify a token and print its claims as JSON.
	Verify {
		#[command(flatten)]
		credentials: Credentials,

		/// The token to verify.
		#[arg(allow_hyphen_values = true)]
		token: String,
	},

	/// Print the claims of a token as JSON, WITHOUT verifying the signature.
	Decode {
		/// The token to decode.
		#[arg(allow_hyphen_values = true)]
		token: String,
	},
}

#[derive(Args, Clone, Default)]
pub struct Credentials {
	/// The application id.
	#[arg(long = "applicationId", env = "DIGEST_TOKEN_APPLICATION_ID")]
	application_id: Option<String>,

	/// The secret shared with the platform.
	#[arg(long, env = "DIGEST_TOKEN_SECRET", hide_env_values = true)]
	secret: Option<String>,

	/// The HMAC algorithm: HS256 (default), HS384 or HS512.
	#[arg(long)]
	algorithm: Option<Algorithm>,
}

impl Credentials {
	fn or(self, file: CredentialsConfig) -> CredentialsConfig {
		CredentialsConfig {
			application_id: self.application_id,
			secret: self.secret,
			algorithm: self.algorithm,
		}
		.or(file)
	}
}

#[derive(Args, Clone)]
pub struct ClaimsArgs {
	/// Expire the token this many seconds from now.
	#[arg(
		long = "expiresInSeconds",
		default_value_t = 3600,
		allow_negative_numbers = true,
		conflicts_with = "expires_at"
	)]
	expires_in_seconds: i64,

	/// Expire the token at this time, in milliseconds since the Unix epoch.
	#[arg(long = "expiresAt", allow_negative_numbers = true)]
	expires_at: Option<i64>,

	/// Only allow the token to be used for authentication.
	#[arg(long = "authenticationOnly", group = "token_type")]
	authentication_only: bool,

	/// Only allow the token to be used for streaming.
	#[arg(long = "streamingOnly", group = "token_type")]
	streaming_only: bool,

	/// Only allow the token to be used for publishing.
	#[arg(long = "publishingOnly", group = "token_type")]
	publishing_only: bool,

	/// Only allow the given origin stream.
	#[arg(long = "originStreamId")]
	origin_stream_id: Option<String>,

	/// Only allow the given channel id.
	#[arg(long, group = "required_tag")]
	channel: Option<String>,

	/// Only allow the given channel alias.
	#[arg(long = "channelAlias", group = "required_tag")]
	channel_alias: Option<String>,

	/// Only allow origin streams carrying this tag.
	#[arg(long, group = "required_tag")]
	tag: Option<String>,

	/// Apply this tag to the new stream. May be repeated.
	#[arg(long = "applyTag")]
	apply_tags: Vec<String>,

	/// Grant this capability. May be repeated.
	#[arg(long = "capability")]
	capabilities: Vec<String>,
}

impl ClaimsArgs {
	fn apply(self, builder: &mut TokenBuilder) -> digest_token::Result<()> {
		match self.expires_at {
			Some(expires) => builder.expires_at_millis(expires),
			None => builder.expires_in_seconds(self.expires_in_seconds)?,
		};

		if self.authentication_only {
			builder.restrict_to_authentication_only();
		}
		if self.streaming_only {
			builder.restrict_to_streaming_only();
		}
		if self.publishing_only {
			builder.restrict_to_publishing_only();
		}

		if let Some(id) = self.origin_stream_id {
			builder.restrict_to_origin_stream(id)?;
		}

		if let Some(channel) = self.channel {
			builder.restrict_to_channel(channel)?;
		}
		if let Some(alias) = self.channel_alias {
			builder.restrict_to_channel_alias(alias)?;
		}
		if let Some(tag) = self.tag {
			builder.restrict_to_tag(tag)?;
		}

		for tag in self.apply_tags {
			builder.apply_tag(tag)?;
		}
		for capability in self.capabilities {
			builder.with_capability(capability)?;
		}

		Ok(())
	}
}

fn run(command: Command, config: Config) -> anyhow::Result<String> {
	match command {
		Command::Sign { credentials, claims } => {
			let credentials = credentials.or(config.credentials);

			let mut builder = TokenBuilder::new();
			if let Some(application_id) = credentials.application_id {
				builder.with_application_id(application_id)?;
			}
			if let Some(secret) = credentials.secret {
				builder.with_secret(secret)?;
			}
			if let Some(algorithm) = credentials.algorithm {
				builder.with_algorithm(algorithm);
			}

			claims.apply(&mut builder)?;

			Ok(builder.build().context("failed to sign token")?)
		}
		Command::Verify { credentials, token } => {
			let key = credentials.or(config.credentials).key()?;
			let claims = digest_token::verify(token.trim(), &key).context("failed to verify token")?;

			tracing::info!(application_id = key.application_id(), "token verified");

			Ok(serde_json::to_string_pretty(&claims)?)
		}
		Command::Decode { token } => {
			let claims = digest_token::decode(token.trim()).context("failed to decode token")?;
			Ok(serde_json::to_string_pretty(&claims)?)
		}
	}
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	cli.log.init();

	let config = match cli.config.as_deref() {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};

	let output = run(cli.command, config)?;
	println!("{output}");

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	const APPLICATION_ID: &str = "my-application-id";
	const SECRET: &str = "my-secret";

	fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
		Cli::try_parse_from(std::iter::once("digest-token").chain(args.iter().copied()))
	}

	fn run_args(args: &[&str]) -> anyhow::Result<String> {
		run(parse(args)?.command, Config::default())
	}

	fn sign(extra: &[&str]) -> anyhow::Result<String> {
		let mut args = vec!["sign", "--applicationId", APPLICATION_ID, "--secret", SECRET];
		args.extend_from_slice(extra);
		run_args(&args)
	}

	fn verify(token: &str) -> anyhow::Result<String> {
		run_args(&["verify", "--applicationId", APPLICATION_ID, "--secret", SECRET, "--", token])
	}

	fn error(result: anyhow::Result<String>) -> digest_token::Error {
		result
			.unwrap_err()
			.downcast::<digest_token::Error>()
			.expect("not a token error")
	}

	#[test]
	fn test_sign_verify() {
		let token = sign(&["--channel", "us-northeast#my-application-id#my-channel.1345"]).unwrap();

		let claims: serde_json::Value = serde_json::from_str(&verify(&token).unwrap()).unwrap();
		assert_eq!(
			claims["requiredTag"],
			"channelId:us-northeast#my-application-id#my-channel.1345"
		);
		assert!(claims["expires"].as_i64().unwrap() > chrono::Utc::now().timestamp_millis());
	}

	#[test]
	fn test_sign_all_flags() {
		let token = sign(&[
			"--expiresAt",
			"4102444800000",
			"--publishingOnly",
			"--originStreamId",
			"origin-1",
			"--channelAlias",
			"lobby",
			"--applyTag",
			"a",
			"--applyTag",
			"b",
			"--capability",
			"hd",
		])
		.unwrap();

		let claims = digest_token::decode(&token).unwrap();
		assert_eq!(claims.expires(), Some(4_102_444_800_000));
		assert_eq!(claims.token_type(), Some(digest_token::TokenType::Publishing));
		assert_eq!(claims.origin_stream_id(), Some("origin-1"));
		assert_eq!(claims.required_tag(), Some("channelAlias:lobby"));
		assert_eq!(claims.apply_tags(), ["a", "b"]);
		assert_eq!(claims.capabilities(), ["hd"]);
	}

	#[test]
	fn test_sign_deterministic() {
		let a = sign(&["--expiresAt", "4102444800000", "--tag", "x"]).unwrap();
		let b = sign(&["--expiresAt", "4102444800000", "--tag", "x"]).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_expired() {
		let token = sign(&["--expiresInSeconds", "-1"]).unwrap();
		assert!(matches!(error(verify(&token)), digest_token::Error::Expired { .. }));
	}

	#[test]
	fn test_wrong_secret() {
		let token = sign(&[]).unwrap();
		let result = run_args(&["verify", "--applicationId", APPLICATION_ID, "--secret", "nope", "--", &token]);
		assert!(matches!(error(result), digest_token::Error::SignatureMismatch));
	}

	#[test]
	fn test_malformed() {
		assert!(matches!(error(verify("garbage")), digest_token::Error::MalformedToken(_)));
		assert!(matches!(
			error(run_args(&["decode", "garbage"])),
			digest_token::Error::MalformedToken(_)
		));
	}

	#[test]
	fn test_decode() {
		let token = sign(&["--expiresAt", "1000", "--streamingOnly"]).unwrap();
		let output = run_args(&["decode", "--", &token]).unwrap();

		let claims: serde_json::Value = serde_json::from_str(&output).unwrap();
		assert_eq!(claims["expires"], 1000);
		assert_eq!(claims["type"], "stream");
	}

	#[test]
	fn test_missing_credentials() {
		let err = error(run(parse(&["sign", "--secret", SECRET]).unwrap().command, Config::default()));
		assert!(matches!(err, digest_token::Error::IllegalState(_)));

		let err = error(run(
			parse(&["sign", "--applicationId", APPLICATION_ID]).unwrap().command,
			Config::default(),
		));
		assert!(matches!(err, digest_token::Error::IllegalState(_)));
	}

	#[test]
	fn test_empty_argument() {
		assert!(matches!(error(sign(&["--tag", ""])), digest_token::Error::InvalidArgument(_)));
	}

	#[test]
	fn test_config_credentials() {
		let config = Config::parse(
			r#"
			[credentials]
			application_id = "my-application-id"
			secret = "my-secret"
			"#,
		)
		.unwrap();

		let token = run(parse(&["sign"]).unwrap().command, config.clone()).unwrap();
		let output = run(parse(&["verify", "--", &token]).unwrap().command, config.clone()).unwrap();
		assert!(output.contains("expires"));

		// Flags win over the file.
		let cli = parse(&["verify", "--secret", "nope", "--", &token]).unwrap();
		assert!(matches!(error(run(cli.command, config)), digest_token::Error::SignatureMismatch));
	}

	#[test]
	fn test_conflicting_flags() {
		assert!(parse(&["sign", "--streamingOnly", "--publishingOnly"]).is_err());
		assert!(parse(&["sign", "--channel", "a", "--tag", "b"]).is_err());
		assert!(parse(&["sign", "--expiresInSeconds", "10", "--expiresAt", "1000"]).is_err());
		assert!(parse(&["sign", "--algorithm", "RS256"]).is_err());
	}

	#[test]
	fn test_algorithm_flag() {
		let token = sign(&["--algorithm", "HS512"]).unwrap();
		assert!(verify(&token).is_err());

		let output = run_args(&[
			"verify",
			"--applicationId",
			APPLICATION_ID,
			"--secret",
			SECRET,
			"--algorithm",
			"HS512",
			"--",
			&token,
		]);
		assert!(output.is_ok());
	}
}
