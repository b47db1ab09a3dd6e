//! Compile-time configuration for adcdiff
//! RP2040-based four-channel ADC differencing monitor

// ===================================================================
// Acquisition
// ===================================================================

pub const CHANNEL_COUNT: usize = 4; // Analog channels swept per trigger
pub const SAMPLE_PERIOD_MS: u64 = 100; // One conversion sweep every 100ms

pub const ADC_RESULT_SHIFT: u8 = 3; // 12-bit converter result -> 9-bit sample
pub const SAMPLE_MASK: u16 = 0x01FF; // 9-bit sample width
pub const SAMPLE_MAX: u16 = SAMPLE_MASK;

// ===================================================================
// Queues and synchronization
// ===================================================================

pub const SAMPLE_QUEUE_LEN: usize = 16; // Interrupt -> coordinator
pub const OUTPUT_QUEUE_LEN: usize = 10; // Coordinator -> reporter

pub const SELECTION_TIMEOUT_MS: u64 = 10; // Bounded wait for a selection press
pub const DEFAULT_SELECTOR: u8 = 1; // 1-based, channel 0

// ===================================================================
// Selection inputs
// ===================================================================

pub const SELECTION_INPUTS: usize = 4; // One button per channel
pub const BUTTON_DEBOUNCE_MS: u64 = 20; // Button debounce time
pub const BUTTON_SCAN_RATE_HZ: u64 = 100; // Button scan frequency

// ===================================================================
// Reporting
// ===================================================================

pub const REPORT_BANNER: &str = "Difference:";
pub const LINE_TERMINATOR: &str = "\r\n";
pub const REPORT_LINE_LEN: usize = 16; // "-32768\r\n" fits with room to spare

pub const STATUS_INTERVAL_SECS: u64 = 10; // Supervisor wake-up
pub const STATUS_REPORT_SECS: u32 = 60; // Diagnostics log cadence

// ===================================================================
// GPIO Pin Assignments - Raspberry Pi Pico
// ===================================================================

// Analog inputs: ADC0..ADC3 on GPIO 26..29
pub const ADC_PINS: [u8; CHANNEL_COUNT] = [26, 27, 28, 29];

// Selection buttons (active-low with pull-ups)
pub const BUTTON_PINS: [u8; SELECTION_INPUTS] = [2, 3, 4, 5];

// Serial output
pub const UART_TX_PIN: u8 = 0;
pub const UART_BAUDRATE: u32 = 115_200;
pub const UART_TX_BUFFER_SIZE: usize = 64;

// Status LED
pub const LED_STATUS_PIN: u8 = 25; // Built-in LED on Pico
