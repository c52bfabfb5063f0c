//! Notifies several observers about the progress of a print job.
//!
//! Run with `RUST_LOG=multicast=trace` to see the attach, detach and broadcast log output.

use std::cell::Cell;
use std::rc::Rc;

use multicast::{Event, LocalEvent};
use tracing_subscriber::EnvFilter;

/// Arguments of one progress notification.
#[derive(Debug)]
struct Progress {
    job: &'static str,
    percent: u8,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    local_progress();
    validated_progress();
}

fn local_progress() {
    println!("=== Local event ===");

    let progress = LocalEvent::<Progress>::new();
    let updates_seen = Rc::new(Cell::new(0_u32));

    let console = progress.attach(|p| println!("[console] {} at {}%", p.job, p.percent));

    let _counter = progress.attach({
        let updates_seen = Rc::clone(&updates_seen);
        move |_| updates_seen.set(updates_seen.get() + 1)
    });

    progress.invoke(&Progress {
        job: "bracket.stl",
        percent: 10,
    });
    progress.invoke(&Progress {
        job: "bracket.stl",
        percent: 50,
    });

    // The console is no longer interested. The counter keeps counting.
    progress.detach(console).expect("console observer was attached above");

    progress.invoke(&Progress {
        job: "bracket.stl",
        percent: 100,
    });

    println!("Counter observer saw {} updates", updates_seen.get());

    if let Err(e) = progress.detach(console) {
        println!("Detaching twice is refused: {e}");
    }
}

fn validated_progress() {
    println!("=== Fallible observers ===");

    let progress = Event::<Progress, Result<(), String>>::new();

    progress.attach(|p| {
        if p.percent > 100 {
            Err(format!("{} reported impossible progress {}%", p.job, p.percent))
        } else {
            Ok(())
        }
    });

    progress.attach(|p| {
        println!("[display] {} at {}%", p.job, p.percent);
        Ok(())
    });

    for percent in [90, 140] {
        match progress.try_invoke(&Progress {
            job: "gear.stl",
            percent,
        }) {
            Ok(()) => println!("Update {percent}% delivered to all observers"),
            Err(e) => println!("Broadcast aborted: {e}"),
        }
    }
}
