use std::time::Duration;

/// Read timeout for single register reads
pub const SINGLE_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Read timeout for every burst of a multi-word read, independent of the burst length
pub const BURST_READ_TIMEOUT: Duration = Duration::from_millis(3000);

/// The baud rate used by the register interface of the Alchitry boards
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DataBits {
    Seven,
    Eight,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Line parameters applied to a serial port after opening it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl SerialSettings {
    /// 8N1 at the given baud rate, which is what the device expects.
    pub fn new(baud_rate: u32) -> SerialSettings {
        SerialSettings {
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        SerialSettings::new(DEFAULT_BAUD_RATE)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub single_read_timeout: Duration,
    pub burst_read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            single_read_timeout: SINGLE_READ_TIMEOUT,
            burst_read_timeout: BURST_READ_TIMEOUT,
        }
    }
}

/// Builder to create a [Config] with modified timeouts
///
/// # Example
///
/// ```
/// use regif_client::config::Builder;
/// use std::time::Duration;
///
/// let config = Builder::new()
///     .burst_read_timeout(Duration::from_secs(5))
///     .build();
/// assert_eq!(config.burst_read_timeout, Duration::from_secs(5));
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set how long a single register read waits for its reply
    pub fn single_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.single_read_timeout = timeout;
        self
    }

    /// Set how long each burst of a multi-word read waits for its reply
    pub fn burst_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.burst_read_timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
