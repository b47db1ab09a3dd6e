//! adcdiff - RP2040 firmware
//!
//! This binary runs the four-channel difference monitor on a Raspberry Pi Pico:
//! - ADC0..ADC3 (GPIO 26..29) swept every 100 ms
//! - Channel selection buttons on GPIO 2..5 (active-low)
//! - Differences reported on UART0 TX (GPIO 0), 115200 baud

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use panic_halt as _;
use defmt_rtt as _;
use static_cell::StaticCell;

// Import all modules from library
extern crate adcdiff;
use adcdiff::*;

/// Queues, flag sets and counters shared by the interrupt and every task
static PIPELINE: StaticCell<channels::Pipeline> = StaticCell::new();

/// Main application entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // Initialize hardware
    let p = embassy_rp::init(Default::default());

    let pipeline: &'static channels::Pipeline = PIPELINE.init(channels::Pipeline::new());

    let mut supervisor = supervisor::AppSupervisor::new(pipeline);

    // Print startup information
    supervisor.print_startup_banner();

    // Initialize and spawn all hardware tasks
    match hardware::init_hardware_tasks(&spawner, p, pipeline) {
        Ok(()) => {
            supervisor.print_init_success();
        }
        Err(e) => {
            error!("Failed to spawn hardware tasks: {:?}", e);
            core::panic!("Hardware initialization failed");
        }
    }

    // Run the main supervisor loop
    supervisor.run().await;
}
