use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NoTargets(String),
    BadIPFormatting(String),
    BadInterfaceName(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NoTargets(e) => write!(f, "Log target configuration error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::BadInterfaceName(e) => write!(f, "Interface name error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failures while establishing or appending to a capture file.
#[derive(Debug)]
pub enum ContainerError {
    Open(std::io::Error),
    Seek(std::io::Error),
    Read(std::io::Error),
    Write(std::io::Error),
    Truncate(std::io::Error),
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Open(e) => write!(f, "Capture file open failed: {}", e),
            ContainerError::Seek(e) => write!(f, "Capture file seek failed: {}", e),
            ContainerError::Read(e) => write!(f, "Capture file read failed: {}", e),
            ContainerError::Write(e) => write!(f, "Capture file write failed: {}", e),
            ContainerError::Truncate(e) => write!(f, "Capture file truncate failed: {}", e),
        }
    }
}

impl std::error::Error for ContainerError {}

/// Failures reported by the link-layer capture/transmission backend.
#[derive(Debug)]
pub enum NetworkError {
    InterfaceNotFound(String),
    AddressUnavailable(String),
    TransmitFailed(String),
    CaptureFailed(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InterfaceNotFound(e) => write!(f, "Interface not found: {}", e),
            NetworkError::AddressUnavailable(e) => write!(f, "Interface address unavailable: {}", e),
            NetworkError::TransmitFailed(e) => write!(f, "Frame transmission failed: {}", e),
            NetworkError::CaptureFailed(e) => write!(f, "Frame capture failed: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

#[derive(Debug)]
pub enum DispatchError {
    Container(ContainerError),
    Transmit(NetworkError),
    SinkPoisoned,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Container(e) => write!(f, "Dispatch to capture file failed: {}", e),
            DispatchError::Transmit(e) => write!(f, "Dispatch to live link failed: {}", e),
            DispatchError::SinkPoisoned => write!(f, "Packet sink lock poisoned"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<ContainerError> for DispatchError {
    fn from(err: ContainerError) -> Self {
        DispatchError::Container(err)
    }
}

impl From<NetworkError> for DispatchError {
    fn from(err: NetworkError) -> Self {
        DispatchError::Transmit(err)
    }
}

#[derive(Debug)]
pub enum PacketError {
    AddressFamilyMismatch(String),
    AddressConversionFailure(String),
    FrameConstruction(String),
    Dispatch(DispatchError),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::AddressFamilyMismatch(e) => write!(f, "Address family mismatch: {}", e),
            PacketError::AddressConversionFailure(e) => {
                write!(f, "Address conversion failed: {}", e)
            }
            PacketError::FrameConstruction(e) => write!(f, "Frame construction failed: {}", e),
            PacketError::Dispatch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PacketError {}

impl From<DispatchError> for PacketError {
    fn from(err: DispatchError) -> Self {
        PacketError::Dispatch(err)
    }
}

#[derive(Debug)]
pub enum ResolveError {
    UnsupportedTargetFamily(String),
    Interface(NetworkError),
    Transmit(NetworkError),
    Capture(NetworkError),
    ResolutionTimeout { attempts: u32 },
    DeadlineExceeded,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnsupportedTargetFamily(e) => {
                write!(f, "Unsupported mirror target (IPv4 only): {}", e)
            }
            ResolveError::Interface(e) => write!(f, "Mirror interface error: {}", e),
            ResolveError::Transmit(e) => write!(f, "ARP request error: {}", e),
            ResolveError::Capture(e) => write!(f, "ARP reply capture error: {}", e),
            ResolveError::ResolutionTimeout { attempts } => write!(
                f,
                "Mirror target did not answer after {} ARP requests",
                attempts
            ),
            ResolveError::DeadlineExceeded => write!(f, "Mirror resolution deadline exceeded"),
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Debug)]
pub enum LogError {
    Config(ConfigError),
    Container(ContainerError),
    Packet(PacketError),
    Resolve(ResolveError),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::Config(e) => write!(f, "Configuration error: {}", e),
            LogError::Container(e) => write!(f, "Container error: {}", e),
            LogError::Packet(e) => write!(f, "Packet error: {}", e),
            LogError::Resolve(e) => write!(f, "Resolution error: {}", e),
        }
    }
}

impl std::error::Error for LogError {}

impl From<ConfigError> for LogError {
    fn from(err: ConfigError) -> Self {
        LogError::Config(err)
    }
}

impl From<ContainerError> for LogError {
    fn from(err: ContainerError) -> Self {
        LogError::Container(err)
    }
}

impl From<PacketError> for LogError {
    fn from(err: PacketError) -> Self {
        LogError::Packet(err)
    }
}

impl From<ResolveError> for LogError {
    fn from(err: ResolveError) -> Self {
        LogError::Resolve(err)
    }
}
