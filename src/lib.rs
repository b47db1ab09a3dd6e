//! adcdiff - Four-channel ADC difference monitor for RP2040
//!
//! This library samples four analog channels every 100 ms, lets the operator
//! pick one of them with four buttons, and reports the successive difference
//! of the selected channel's readings over UART, using the Embassy async
//! framework.
//!
//! ## Architecture
//! - **Interrupt side**: the ADC FIFO interrupt turns each finished conversion
//!   into a [`types::Sample`], queues it without blocking and raises the
//!   channel's ready flag
//! - **Coordinator**: drains flagged samples into a last-value table, applies
//!   button selections and forwards the active channel's value
//! - **Reporter**: differences consecutive forwarded values and writes one
//!   text line per value
//! - **Channels**: queues and flag sets live in one [`channels::Pipeline`]
//!   built at startup and shared by `&'static` reference
//!
//! Everything except [`hardware`] is target-independent and runs in host tests.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module
#[macro_use]
mod fmt;

// Export all modules for use by the firmware binary
pub mod acquisition;
pub mod buttons;
pub mod channels;
pub mod config;
pub mod coordinator;
pub mod flags;
pub mod reporter;
pub mod supervisor;
pub mod types;

#[cfg(feature = "rp2040")]
pub mod hardware;

// ADC and UART interrupt bindings - shared by all binaries
#[cfg(feature = "rp2040")]
embassy_rp::bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => hardware::ConversionInterrupt;
    UART0_IRQ => embassy_rp::uart::BufferedInterruptHandler<embassy_rp::peripherals::UART0>;
});
