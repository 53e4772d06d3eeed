use acdtest_capture::{list_interfaces, InterfaceInfo};
use acdtest_cli::args::{announce_options, parse_optional_mac, run_config};
use acdtest_cli::{Cli, Commands};
use acdtest_harness::{run_on_interface, tools, IntervalAnalysis};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Warn about an interface missing from the datalink listing; the run still goes ahead
fn check_interface(name: &str) {
    let Ok(interfaces) = list_interfaces() else {
        return;
    };
    if interfaces.iter().any(|iface| iface.name == name) {
        return;
    }

    warn!(interface = name, "Interface not found");
    eprintln!("Warning: Interface '{}' not found in list:", name);
    for iface in &interfaces {
        eprintln!("  - {}", iface.name);
    }
    eprintln!("\nTrying anyway...");
}

fn print_interfaces(interfaces: &[InterfaceInfo]) {
    println!("Available network interfaces:");
    println!("{}", "-".repeat(60));
    for iface in interfaces {
        println!("Name: {}", iface.name);
        if !iface.description.is_empty() {
            println!("  Description: {}", iface.description);
        }
        match iface.mac {
            Some(mac) => println!("  MAC: {}", mac),
            None => println!("  MAC: N/A"),
        }
        match iface.primary_ipv4() {
            Some(ip) => println!("  IPv4: {}", ip),
            None => println!("  IPv4: N/A"),
        }
        println!(
            "  Status: {}{}",
            if iface.is_up { "up" } else { "down" },
            if iface.is_loopback { ", loopback" } else { "" }
        );
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::RetryTiming {
            ip,
            device_mac,
            interface,
            retry_delay,
            max_attempts,
            duration,
            test_ongoing,
            announce_op,
            attempt_boundary_ms,
        } => {
            let config = run_config(
                ip,
                &device_mac,
                &interface,
                retry_delay,
                max_attempts,
                duration,
                test_ongoing,
                announce_op,
                attempt_boundary_ms,
            )?;
            check_interface(&config.interface);

            let rule = "=".repeat(70);
            println!("{}", rule);
            println!("ACD Retry Logic Timing Test");
            println!("{}", rule);
            println!("{}", config);
            println!("{}", rule);
            if config.test_ongoing {
                println!("\nTesting ongoing phase defense:");
                println!("  1. Wait for device to acquire IP");
                println!("  2. Send first conflict (should be defended)");
                println!("  3. Send second conflict within the defend interval (should trigger retreat)");
                println!("  4. Verify device removes IP and starts retry");
            } else {
                println!("\nTesting probe phase retry:");
                println!("  - Responding to all probes to trigger conflicts");
                println!("  - Measuring retry timing");
            }
            println!("\nWaiting for ARP traffic from the device...");
            println!("Press Ctrl+C to stop early\n");

            let report = run_on_interface(config).await?;
            println!("\n{}", report);
        }
        Commands::Interfaces => {
            let interfaces = list_interfaces()?;
            print_interfaces(&interfaces);
        }
        Commands::Announce {
            ip,
            interface,
            mac,
            count,
            interval,
            continuous,
            announce_op,
        } => {
            let mac = parse_optional_mac(mac.as_deref())?;
            let options = announce_options(count, interval, continuous)?;
            check_interface(&interface);

            println!("Sending ARP announcements claiming {}...", ip);
            println!("Press Ctrl+C to stop");
            let sent =
                tools::announce_on_interface(&interface, ip, mac, announce_op.into(), options)
                    .await?;
            println!("\nSent {} ARP announcement(s).", sent);
        }
        Commands::Respond {
            ip,
            interface,
            mac,
            duration,
        } => {
            let mac = parse_optional_mac(mac.as_deref())?;
            check_interface(&interface);

            println!("Listening for ARP probes for {}...", ip);
            println!("Will automatically respond for {} seconds", duration);
            println!("Press Ctrl+C to stop");
            let answered =
                tools::respond_on_interface(&interface, ip, mac, Duration::from_secs(duration))
                    .await?;
            println!("\nResponded to {} ARP probes.", answered);
        }
        Commands::Analyze {
            csv_file,
            timestamps,
            mac,
        } => {
            let analysis = match csv_file {
                Some(path) => {
                    info!(file = %path.display(), mac = ?mac, "Reading CSV export");
                    IntervalAnalysis::from_csv_file(&path, mac.as_deref())?
                }
                None => IntervalAnalysis::from_timestamps(timestamps)?,
            };
            info!(packets = analysis.timestamps.len(), "Analyzing timestamps");
            println!("\n{}", analysis);
        }
    }

    Ok(())
}
