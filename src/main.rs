use std::io::Write;
use std::net::{IpAddr, ToSocketAddrs};
use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use log::error;

use echoprobe::port::{is_port_open, CONNECT_TIMEOUT};
use echoprobe::{PingOption, Pinger, ProbeError, RawTransport, DEFAULT_COUNT};

#[derive(Debug, Parser)]
#[clap(
    name = "echoprobe",
    version = "0.1.0",
    about = "Send a few ICMP echo requests to one host and report round-trip statistics."
)]
struct Opt {
    #[clap(
        short = 'n',
        long = "host-name",
        conflicts_with = "ip_address",
        required_unless_present = "ip_address",
        help = "host name to ping"
    )]
    host_name: Option<String>,

    #[clap(short = 'i', long = "ip-address", help = "IPv4 address to ping")]
    ip_address: Option<IpAddr>,

    #[clap(short = 'p', long = "port", help = "TCP port to check before pinging")]
    port: Option<u16>,

    #[clap(
        short = 't',
        long = "time-interval",
        value_parser = parse_seconds,
        help = "seconds to wait between pings"
    )]
    time_interval: Option<Duration>,

    #[clap(
        short = 'w',
        long = "wait-period",
        value_parser = parse_wait,
        help = "seconds to wait for each reply, also bounds the whole run [default: 100]"
    )]
    wait_period: Option<Duration>,

    #[clap(short = 'c', long = "count", default_value_t = DEFAULT_COUNT, help = "number of pings")]
    count: usize,

    #[clap(
        short = 's',
        long = "size",
        default_value = "56",
        value_parser = clap::value_parser!(u16).range(8..=65000),
        help = "payload size"
    )]
    size: u16,

    #[clap(long = "ident", help = "echo identifier [default: random]")]
    ident: Option<u16>,

    #[clap(long = "ttl", help = "time to live")]
    ttl: Option<u32>,

    #[clap(short = 'z', long = "tos", help = "type of service")]
    tos: Option<u32>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("{:#}", e);
        let code = if e.downcast_ref::<ProbeError>().is_some() { 3 } else { 1 };
        process::exit(code);
    }
}

fn run(opt: Opt) -> Result<()> {
    let addr = match (opt.ip_address, opt.host_name.as_deref()) {
        (Some(ip), _) => ip,
        (None, Some(host)) => resolve(host)?,
        (None, None) => return Err(anyhow!("a host name or an ip address is required")),
    };

    if let Some(port) = opt.port {
        if is_port_open(addr, port, CONNECT_TIMEOUT) {
            println!("Port number {} at {} is OPEN", port, addr);
        } else {
            println!("Port number {} at {} is CLOSED", port, addr);
        }
    }

    let mut popt = PingOption {
        interval: opt.time_interval.filter(|d| !d.is_zero()),
        ident: opt.ident,
        len: opt.size as usize,
        ..Default::default()
    };
    if let Some(wait) = opt.wait_period {
        popt.timeout = wait;
    }

    let transport = RawTransport::new(opt.ttl, opt.tos);
    let mut pinger = Pinger::new(addr, popt, transport)?;
    let report = pinger.run(opt.count)?;
    println!("{}", report);

    Ok(())
}

/// Resolve `host`, preferring an IPv4 address.
fn resolve(host: &str) -> Result<IpAddr> {
    let addrs: Vec<IpAddr> = (host, 0)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {}", host))?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow!("no address found for {}", host))
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("`{}` is not a number of seconds", s))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{}` is not a valid duration", s))
}

fn parse_wait(s: &str) -> Result<Duration, String> {
    let wait = parse_seconds(s)?;
    if wait.is_zero() {
        return Err("wait period must be greater than zero".to_string());
    }
    Ok(wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Opt::command().debug_assert();
    }

    #[test]
    fn test_exactly_one_target() {
        assert!(Opt::try_parse_from(["echoprobe"]).is_err());
        assert!(Opt::try_parse_from(["echoprobe", "-n", "localhost", "-i", "127.0.0.1"]).is_err());

        let opt = Opt::try_parse_from(["echoprobe", "-i", "10.0.0.1", "-p", "443"]).unwrap();
        assert_eq!(opt.ip_address, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(opt.port, Some(443));
        assert_eq!(opt.count, 3);
        assert_eq!(opt.size, 56);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(Opt::try_parse_from(["echoprobe", "-i", "300.1.1.1"]).is_err());
        assert!(Opt::try_parse_from(["echoprobe", "-i", "10.0.0.1", "-p", "70000"]).is_err());
        assert!(Opt::try_parse_from(["echoprobe", "-i", "10.0.0.1", "-t", "soon"]).is_err());
        assert!(Opt::try_parse_from(["echoprobe", "-i", "10.0.0.1", "-w", "0"]).is_err());
        assert!(Opt::try_parse_from(["echoprobe", "-i", "10.0.0.1", "-s", "4"]).is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_seconds("0"), Ok(Duration::ZERO));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_wait("0.25").is_ok());
    }

    #[test]
    fn test_resolve_literal() {
        assert_eq!(resolve("127.0.0.1").unwrap(), "127.0.0.1".parse::<IpAddr>().unwrap());
    }
}
