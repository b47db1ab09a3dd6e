//! RP2040 hardware binding
//!
//! This module wires the pipeline to the Raspberry Pi Pico: the ADC runs
//! one round-robin sweep over ADC0..ADC3 per trigger, each result raises
//! `ADC_IRQ_FIFO`, and the interrupt hands the result to the registered
//! [`ConversionHandler`]. It also builds the UART transmitter used by the
//! reporter and spawns every task.

use embassy_executor::{SpawnError, Spawner};
use embassy_rp::adc::{self, Adc, Blocking};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::interrupt::typelevel::{self, Handler, Interrupt};
use embassy_rp::pac;
use embassy_rp::uart::{self, BufferedUartTx};
use embassy_rp::Peripherals;
use embassy_sync::once_lock::OnceLock;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;

use crate::acquisition::{run_acquisition_timer, ConversionHandler, ConversionTrigger, SweepCursor};
use crate::buttons::run_selection_poller;
use crate::channels::Pipeline;
use crate::config::*;
use crate::coordinator::Coordinator;
use crate::reporter::{IoSink, Reporter};

/// Round-robin mask selecting ADC0..ADC3
const ROUND_ROBIN_MASK: u8 = 0b0_1111;

/// Handler the conversion interrupt delivers to, set once at startup
static CONVERSION_HANDLER: OnceLock<ConversionHandler<'static>> = OnceLock::new();

/// Channel attribution for the sweep currently running in the ADC
static SWEEP: SweepCursor = SweepCursor::new();

/// Reporter transport: UART0 TX through a ring buffer
pub type UartSink = IoSink<BufferedUartTx>;

// ===================================================================
// Conversion Interrupt
// ===================================================================

/// `ADC_IRQ_FIFO` handler, bound in [`crate::Irqs`]
pub struct ConversionInterrupt;

impl Handler<typelevel::ADC_IRQ_FIFO> for ConversionInterrupt {
    unsafe fn on_interrupt() {
        let regs = pac::ADC;

        while regs.fcs().read().level() > 0 {
            let raw = regs.fifo().read().val();
            let (source, more) = SWEEP.complete();

            if let Some(handler) = CONVERSION_HANDLER.try_get() {
                // Drops and spurious sources are counted by the handler
                let _ = handler.on_conversion_complete(source, raw);
            }

            // Round-robin has already advanced AINSEL to the next channel
            if more {
                regs.cs().modify(|w| w.set_start_once(true));
            }
        }
    }
}

/// Register the pipeline with the conversion interrupt
pub fn register_conversion_handler(pipeline: &'static Pipeline) {
    if CONVERSION_HANDLER.init(ConversionHandler::new(pipeline)).is_err() {
        warn!("Conversion handler already registered");
    }
}

// ===================================================================
// ADC Sweep Trigger
// ===================================================================

/// The ADC configured for interrupt-driven round-robin sweeps
pub struct AdcSweep {
    _adc: Adc<'static, Blocking>,
    _inputs: [adc::Channel<'static>; CHANNEL_COUNT],
}

impl AdcSweep {
    /// Take over an enabled ADC: round-robin over the four inputs, FIFO
    /// interrupt on every result
    pub fn new(adc: Adc<'static, Blocking>, inputs: [adc::Channel<'static>; CHANNEL_COUNT]) -> Self {
        let regs = pac::ADC;

        regs.cs().modify(|w| {
            w.set_ainsel(0);
            w.set_rrobin(ROUND_ROBIN_MASK);
        });
        regs.fcs().write(|w| {
            w.set_en(true);
            w.set_thresh(1);
            w.set_err(false);
        });
        regs.inte().write(|w| w.set_fifo(true));

        typelevel::ADC_IRQ_FIFO::unpend();
        unsafe { typelevel::ADC_IRQ_FIFO::enable() };

        info!("ADC configured: round-robin over {} channels", CHANNEL_COUNT);

        Self {
            _adc: adc,
            _inputs: inputs,
        }
    }
}

impl ConversionTrigger for AdcSweep {
    fn start_sweep(&mut self) {
        let regs = pac::ADC;

        if SWEEP.in_progress() {
            warn!("Previous sweep unfinished, restarting");
        }

        critical_section::with(|_| {
            // Results of an interrupted sweep are discarded
            while regs.fcs().read().level() > 0 {
                let _ = regs.fifo().read();
            }
            SWEEP.restart();
            regs.cs().modify(|w| {
                w.set_ainsel(0);
                w.set_start_once(true);
            });
        });
    }
}

// ===================================================================
// Task Spawning
// ===================================================================

/// Initialize peripherals and spawn every application task
pub fn init_hardware_tasks(
    spawner: &Spawner,
    p: Peripherals,
    pipeline: &'static Pipeline,
) -> Result<(), SpawnError> {
    info!("Initializing hardware");

    register_conversion_handler(pipeline);

    // Analog inputs on GPIO 26..29
    let adc = Adc::new_blocking(p.ADC, adc::Config::default());
    let inputs = [
        adc::Channel::new_pin(p.PIN_26, Pull::None),
        adc::Channel::new_pin(p.PIN_27, Pull::None),
        adc::Channel::new_pin(p.PIN_28, Pull::None),
        adc::Channel::new_pin(p.PIN_29, Pull::None),
    ];
    let sweep = AdcSweep::new(adc, inputs);

    // Selection buttons (active-low with pull-ups)
    let buttons = [
        Input::new(p.PIN_2, Pull::Up),
        Input::new(p.PIN_3, Pull::Up),
        Input::new(p.PIN_4, Pull::Up),
        Input::new(p.PIN_5, Pull::Up),
    ];

    // Report output on UART0 TX (GPIO 0)
    static UART_TX_BUFFER: StaticCell<[u8; UART_TX_BUFFER_SIZE]> = StaticCell::new();
    let mut uart_config = uart::Config::default();
    uart_config.baudrate = UART_BAUDRATE;
    let uart_tx = BufferedUartTx::new(
        p.UART0,
        crate::Irqs,
        p.PIN_0,
        UART_TX_BUFFER.init([0; UART_TX_BUFFER_SIZE]),
        uart_config,
    );

    spawner.spawn(coordinator_task(pipeline))?;
    spawner.spawn(reporter_task(pipeline, IoSink::new(uart_tx)))?;
    spawner.spawn(selection_task(buttons, pipeline))?;
    spawner.spawn(status_task(Output::new(p.PIN_25, Level::Low)))?;

    // Consumers first, then start converting
    spawner.spawn(acquisition_task(sweep))?;

    Ok(())
}

#[embassy_executor::task]
async fn acquisition_task(sweep: AdcSweep) {
    run_acquisition_timer(sweep, Duration::from_millis(SAMPLE_PERIOD_MS)).await;
}

#[embassy_executor::task]
async fn coordinator_task(pipeline: &'static Pipeline) {
    Coordinator::new(pipeline).run().await;
}

#[embassy_executor::task]
async fn reporter_task(pipeline: &'static Pipeline, sink: UartSink) {
    Reporter::new().run(&pipeline.output, sink).await;
}

#[embassy_executor::task]
async fn selection_task(inputs: [Input<'static>; SELECTION_INPUTS], pipeline: &'static Pipeline) {
    run_selection_poller(inputs, &pipeline.selection).await;
}

/// Status LED task implementation
#[embassy_executor::task]
pub async fn status_task(mut status_led: Output<'static>) {
    info!("Status LED task started");

    loop {
        // Heartbeat pattern - short blink every second
        status_led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        status_led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
