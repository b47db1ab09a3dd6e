//! Application supervisor and monitoring
//!
//! This module provides the startup banner and periodic status reporting,
//! including the pipeline's drop/spurious counters.

use embassy_time::{Duration, Timer};

use crate::channels::{DiagnosticsSnapshot, Pipeline};
use crate::config::*;
use crate::types::APP_VERSION;

/// Application supervisor responsible for monitoring and lifecycle logging
pub struct AppSupervisor<'a> {
    pipeline: &'a Pipeline,
    uptime_seconds: u32,
    last_heartbeat: u32,
    last_diagnostics: DiagnosticsSnapshot,
}

impl<'a> AppSupervisor<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            uptime_seconds: 0,
            last_heartbeat: 0,
            last_diagnostics: DiagnosticsSnapshot::default(),
        }
    }

    /// Print application startup banner with acquisition parameters
    pub fn print_startup_banner(&self) {
        info!("========================================");
        info!(
            "adcdiff v{}.{}.{}",
            APP_VERSION.major, APP_VERSION.minor, APP_VERSION.patch
        );
        info!("Four-channel ADC difference monitor");
        info!("========================================");
        info!("Hardware: RP2040 (Raspberry Pi Pico)");
        info!(
            "Channels: {} (GPIO {}..{}), sweep every {} ms",
            CHANNEL_COUNT, ADC_PINS[0], ADC_PINS[CHANNEL_COUNT - 1], SAMPLE_PERIOD_MS
        );
        info!(
            "Buttons: GPIO {}..{} select channel 0..{}",
            BUTTON_PINS[0], BUTTON_PINS[SELECTION_INPUTS - 1], SELECTION_INPUTS - 1
        );
        info!("Sample range: 0..={}", SAMPLE_MAX);
        info!(
            "Queues: samples {}, output {}",
            SAMPLE_QUEUE_LEN, OUTPUT_QUEUE_LEN
        );
        info!(
            "Output: UART TX GPIO {} @ {} baud",
            UART_TX_PIN, UART_BAUDRATE
        );
        info!("Status LED: GPIO {}", LED_STATUS_PIN);
        info!("========================================");
    }

    /// Print successful initialization message
    pub fn print_init_success(&self) {
        info!("adcdiff initialized successfully");
        info!("Selector defaults to {} (channel {})", DEFAULT_SELECTOR, DEFAULT_SELECTOR - 1);
    }

    /// Run the main supervisor loop
    pub async fn run(&mut self) {
        info!("Application supervisor started");

        loop {
            Timer::after(Duration::from_secs(STATUS_INTERVAL_SECS)).await;
            self.uptime_seconds += STATUS_INTERVAL_SECS as u32;

            if let Some(diagnostics) = self.check_diagnostics() {
                warn!(
                    "Pipeline: dropped {} spurious {} coalesced {}",
                    diagnostics.dropped, diagnostics.spurious, diagnostics.coalesced_ready
                );
            }

            if self.uptime_seconds - self.last_heartbeat >= STATUS_REPORT_SECS {
                self.print_status();
                self.last_heartbeat = self.uptime_seconds;
            }
        }
    }

    /// New diagnostics snapshot if any counter moved since the last check
    pub fn check_diagnostics(&mut self) -> Option<DiagnosticsSnapshot> {
        let current = self.pipeline.diagnostics.snapshot();
        if current == self.last_diagnostics {
            None
        } else {
            self.last_diagnostics = current;
            Some(current)
        }
    }

    /// Print current application status
    fn print_status(&self) {
        let minutes = self.uptime_seconds / 60;
        let hours = minutes / 60;
        let remaining_minutes = minutes % 60;

        if hours > 0 {
            info!("Status: Uptime {}h{}m", hours, remaining_minutes);
        } else {
            info!("Status: Uptime {}m", minutes);
        }

        info!(
            "Status: {} sample(s) queued, {} value(s) awaiting report",
            self.pipeline.samples.len(),
            self.pipeline.output.len()
        );
    }

    /// Get current uptime in seconds
    pub fn uptime(&self) -> u32 {
        self.uptime_seconds
    }
}
