use std::io::{self, Write};
use std::time::Duration;

use anyhow::{anyhow, Context};
use mgame_sdk::{
    params, CanonicalizeExt, Client, Credentials, SignableRequest, SigningExt, SimpleKeyProvider,
    VerifyingConfig, VerifyingExt,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
enum Mode {
    /// Print the string to sign of the request read from stdin
    Canonicalize,
    /// Sign the request read from stdin and write it back out
    Sign,
    /// Verify the signature of the request read from stdin
    Verify {
        /// Do not check X-M-Date against the current time
        #[structopt(long)]
        skip_date: bool,
        /// Allowed distance between X-M-Date and the current time, in seconds
        #[structopt(long, default_value = "300")]
        date_leeway: u64,
    },
    /// Look up a user by login token
    UserInfo {
        /// Login token handed to the game client
        #[structopt(long)]
        token: String,
    },
    /// Look up an order by transaction number
    Order {
        /// Transaction number
        #[structopt(long)]
        tr_no: String,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Sign, verify and send MGame platform requests.")]
struct Opt {
    #[structopt(subcommand)]
    mode: Mode,

    /// Game id
    #[structopt(long, env = "MGAME_APP_ID", global = true, default_value = "0")]
    app_id: u64,

    /// Merchant id
    #[structopt(long, env = "MGAME_MERCHANT_ID", global = true, default_value = "0")]
    merchant_id: u64,

    /// Access id of the game server
    #[structopt(long, env = "MGAME_ACCESS_ID", global = true, default_value = "")]
    access_id: String,

    /// Access secret of the game server
    #[structopt(long, env = "MGAME_ACCESS_SECRET", global = true, hide_env_values = true)]
    access_secret: Option<String>,

    /// Gateway host
    #[structopt(long, env = "MGAME_HOST", global = true)]
    host: Option<String>,

    /// Gateway port
    #[structopt(long, env = "MGAME_PORT", global = true)]
    port: Option<u16>,
}

impl Opt {
    fn credentials(&self) -> anyhow::Result<Credentials> {
        let secret = self
            .access_secret
            .as_deref()
            .ok_or_else(|| anyhow!("No access secret provided"))?;
        Ok(Credentials::new(
            self.app_id,
            self.merchant_id,
            &self.access_id,
            secret,
        ))
    }
    fn client(&self) -> anyhow::Result<Client<mgame_sdk::ReqwestTransport>> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| anyhow!("No gateway host provided"))?;
        Ok(Client::new(self.credentials()?).with_host(host, self.port))
    }
    fn verification_config(
        &self,
        skip_date: bool,
        date_leeway: u64,
    ) -> anyhow::Result<VerifyingConfig> {
        let credentials = self.credentials()?;
        let key_provider =
            SimpleKeyProvider::new([(credentials.access_id(), credentials.access_secret())]);

        Ok(VerifyingConfig::new(key_provider)
            .with_validate_date(!skip_date)
            .with_date_leeway(Duration::from_secs(date_leeway)))
    }
}

fn read_request() -> anyhow::Result<SignableRequest> {
    let req = SignableRequest::from_reader(&mut io::stdin().lock())
        .context("Failed to parse request from stdin")?;
    log::info!("{:?}", req);
    Ok(req)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opt = Opt::from_args();

    match &opt.mode {
        Mode::Canonicalize => {
            let res = read_request()?.canonicalize()?;
            io::stdout().lock().write_all(res.as_bytes())?;
        }
        Mode::Sign => {
            let mut req = read_request()?;
            req.sign(&opt.credentials()?.signing_config())?;
            req.write(&mut io::stdout().lock())?;
        }
        Mode::Verify {
            skip_date,
            date_leeway,
        } => {
            read_request()?.verify(&opt.verification_config(*skip_date, *date_leeway)?)?;
            println!("OK");
        }
        Mode::UserInfo { token } => {
            let body = opt
                .client()?
                .query_user_info(params([("token", token.as_str())]))
                .await?;
            println!("{}", body);
        }
        Mode::Order { tr_no } => {
            let body = opt
                .client()?
                .query_order(params([("tr_no", tr_no.as_str())]))
                .await?;
            println!("{}", body);
        }
    }

    Ok(())
}
