// Interactive command loop for an oscilloscope
//
// Finds the first supported scope on a USB serial port (or the given port),
// then reads commands from stdin. Anything that isn't a built-in command is
// sent to the instrument as-is; commands ending in '?' print the response.

use clap::Parser;
use scopeout_rs::{
    DeviceRegistry, Oscilloscope, PlotData, PollConfig, ScopeFinder, SerialTransport,
    TransportConfig,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scope_repl")]
#[command(about = "Rudimentary REPL for a bench oscilloscope")]
struct Args {
    /// Serial port of the instrument; searched on all USB ports when omitted
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Give up waiting for a trigger after this many seconds
    #[arg(short, long)]
    trigger_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_plot(plot: &PlotData) {
    println!("x [{}]: {} points", plot.x.unit, plot.x.values.len());
    println!("y [{}]:", plot.y.unit);
    for (x, y) in plot.x.values.iter().zip(&plot.y.values).take(20) {
        println!("  {:>10.3}  {:>10.3}", x, y);
    }
    if plot.x.values.len() > 20 {
        println!("  ...");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    println!("Initializing...");
    let config = TransportConfig::default().with_baud_rate(args.baud);
    let scope = match &args.port {
        Some(port) => {
            let transport = SerialTransport::open(port, config)?;
            Some(Oscilloscope::connect(transport, &DeviceRegistry::new()).map_err(|(_, e)| e)?)
        }
        None => ScopeFinder::new(DeviceRegistry::new(), config)
            .find_serial_scopes()?
            .into_iter()
            .next(),
    };

    let Some(scope) = scope else {
        println!("No oscilloscopes detected.");
        return Ok(());
    };

    let mut poll_config = PollConfig::default();
    if let Some(secs) = args.trigger_timeout {
        poll_config = poll_config.with_max_wait(Duration::from_secs(secs));
    }
    let mut scope = scope.with_poll_config(poll_config);

    println!(
        "{} {} Oscilloscope REPL",
        scope.identity().vendor,
        scope.identity().model
    );
    println!("Enter command:\n");

    let stdin = io::stdin();
    loop {
        print!(">>");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim().to_lowercase();

        let result: Result<(), Box<dyn std::error::Error>> = match command.as_str() {
            "exit" | "x" => break,
            "read" | "r" => scope.read().map(|r| println!("{}", r)).map_err(Into::into),
            "id" => scope.describe().map(|d| println!("{}", d)).map_err(Into::into),
            "getwave" | "w" => scope
                .fetch_waveform_raw()
                .map(|w| println!("{}", w))
                .map_err(Into::into),
            "curve" | "c" => scope
                .fetch_curve()
                .map(|c| println!("{:?}", c))
                .map_err(Into::into),
            "plot" | "p" => scope.plot_data().map(|p| print_plot(&p)).map_err(Into::into),
            "trigplot" | "tp" => {
                println!("Waiting for trigger...");
                scope
                    .triggered_plot_data(|| false)
                    .map(|p| {
                        println!("TRIGGER");
                        print_plot(&p)
                    })
                    .map_err(Into::into)
            }
            "" => Ok(()),
            _ => {
                let sent = if command.ends_with('?') {
                    scope.query(&command).map(|r| println!("{}", r))
                } else {
                    scope.write(&command)
                };
                sent.map_err(Into::into)
            }
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}
