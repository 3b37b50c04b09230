use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("netmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("netmap")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Scan a domain, wait for the discovery job to finish, and lay out the \
                resulting recon graph.",
                )
                .arg(
                    arg!(-d --"domain" <DOMAIN>)
                        .required(true)
                        .help("The root domain to map, e.g. example.com"),
                )
                .arg(
                    arg!(--"depth" <DEPTH>)
                        .required(false)
                        .default_value("2")
                        .value_parser(clap::value_parser!(u8).range(1..=3))
                        .help("Discovery depth (1-3)")
                        .long_help(
                            "Discovery depth:\n  \
                            1: first ring - the target's IP addresses, their subnets, and all \
                            of the target's subdomains\n  \
                            2: second ring - repeat the full cycle for every subdomain found \
                            in the first ring\n  \
                            3: third ring - repeat the cycle for all second-ring results; \
                            maximum depth, very slow",
                        ),
                )
                .arg(
                    arg!(-s --"server" <URL>)
                        .required(false)
                        .default_value("http://127.0.0.1:8000")
                        .help("Base URL of the discovery server")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"width" <PIXELS>)
                        .required(false)
                        .default_value("1920")
                        .value_parser(clap::value_parser!(f64))
                        .help("Viewport width the layout targets"),
                )
                .arg(
                    arg!(--"height" <PIXELS>)
                        .required(false)
                        .default_value("1080")
                        .value_parser(clap::value_parser!(f64))
                        .help("Viewport height the layout targets"),
                )
                .arg(
                    arg!(--"interval" <SECONDS>)
                        .required(false)
                        .default_value("5")
                        .value_parser(clap::value_parser!(u64))
                        .help("Seconds between polls while the scan is running"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the positioned graph JSON to a file instead of stdout")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
