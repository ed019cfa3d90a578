use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use log::{debug, info, trace, warn};

use super::arp;
use crate::error_handling::types::{NetworkError, ResolveError};
use crate::session::MacAddr;

pub const ARP_ATTEMPTS: u32 = 50;
pub const ARP_RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// Frames inspected per attempt before re-broadcasting, so that busy
/// segments do not starve the retry schedule.
pub const ARP_FRAMES_PER_ATTEMPT: usize = 1000;

/// A network interface able to send raw frames and observe incoming ARP
/// traffic.
pub trait LinkLayer {
    fn interface(&self) -> &str;

    fn hardware_address(&self) -> Result<MacAddr, NetworkError>;

    fn ipv4_address(&self) -> Result<Ipv4Addr, NetworkError>;

    fn send(&mut self, frame: &[u8]) -> Result<(), NetworkError>;

    /// Feeds received frames to `on_frame` until it returns `true`,
    /// `max_frames` have been seen, or the read timeout expires. Returns the
    /// number of frames seen.
    fn dispatch(
        &mut self,
        max_frames: usize,
        on_frame: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<usize, NetworkError>;
}

/// Waits between resolution attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry schedule of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    pub attempts: u32,
    pub retry_interval: Duration,
    pub frames_per_attempt: usize,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            attempts: ARP_ATTEMPTS,
            retry_interval: ARP_RETRY_INTERVAL,
            frames_per_attempt: ARP_FRAMES_PER_ATTEMPT,
        }
    }
}

/// Addresses needed to replay frames toward a resolved mirror target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorEndpoint {
    pub local_hw_addr: MacAddr,
    pub local_ip: Ipv4Addr,
    pub target_hw_addr: MacAddr,
    pub target_ip: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    RequestSent { attempt: u32 },
    Retry { attempt: u32 },
    Matched(MacAddr),
    Exhausted { attempts: u32 },
}

/// Discovers the hardware address of a mirror target with ARP.
///
/// Blocks the calling thread for up to `attempts × retry_interval` plus the
/// capture windows. There is no cancellation; callers that need a deadline
/// use [`resolve_detached`].
#[derive(Debug)]
pub struct MirrorResolver<L: LinkLayer, S: Sleeper = ThreadSleeper> {
    link: L,
    sleeper: S,
    policy: ResolverPolicy,
}

impl<L: LinkLayer> MirrorResolver<L, ThreadSleeper> {
    pub fn new(link: L) -> Self {
        Self::with_sleeper(link, ThreadSleeper)
    }
}

impl<L: LinkLayer, S: Sleeper> MirrorResolver<L, S> {
    pub fn with_sleeper(link: L, sleeper: S) -> Self {
        Self {
            link,
            sleeper,
            policy: ResolverPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ResolverPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Gives the link back, e.g. to transmit replayed frames on it.
    pub fn into_link(self) -> L {
        self.link
    }

    /// Resolves the hardware address of `target`, an IPv4 literal.
    ///
    /// # Errors
    /// - [`ResolveError::UnsupportedTargetFamily`] if `target` is not IPv4.
    /// - [`ResolveError::Interface`] if the local addresses are unavailable.
    /// - [`ResolveError::Transmit`] / [`ResolveError::Capture`] on link failures.
    /// - [`ResolveError::ResolutionTimeout`] once every attempt went unanswered.
    pub fn resolve(&mut self, target: &str) -> Result<MirrorEndpoint, ResolveError> {
        let target_ip = parse_target(target)?;
        let local_ip = self.link.ipv4_address().map_err(ResolveError::Interface)?;
        let local_hw = self.link.hardware_address().map_err(ResolveError::Interface)?;
        let attempts = self.policy.attempts.max(1);
        let request = arp::request_frame(local_hw, local_ip, target_ip);

        debug!(
            "Resolving mirror target {} on {} from {} ({})",
            target_ip,
            self.link.interface(),
            local_ip,
            local_hw
        );

        self.broadcast(&request)?;
        let mut state = ResolveState::RequestSent { attempt: 1 };
        loop {
            state = match state {
                ResolveState::RequestSent { attempt } => match self.observe(target_ip)? {
                    Some(hw) => ResolveState::Matched(hw),
                    None if attempt < attempts => ResolveState::Retry { attempt },
                    None => ResolveState::Exhausted { attempts: attempt },
                },
                ResolveState::Retry { attempt } => {
                    trace!("No ARP reply from {} after attempt {}", target_ip, attempt);
                    self.sleeper.sleep(self.policy.retry_interval);
                    self.broadcast(&request)?;
                    ResolveState::RequestSent {
                        attempt: attempt + 1,
                    }
                }
                ResolveState::Matched(target_hw_addr) => {
                    info!("Mirror target is up: {} at {}", target_ip, target_hw_addr);
                    return Ok(MirrorEndpoint {
                        local_hw_addr: local_hw,
                        local_ip,
                        target_hw_addr,
                        target_ip,
                    });
                }
                ResolveState::Exhausted { attempts } => {
                    warn!(
                        "Mirror target {} did not answer {} ARP requests",
                        target_ip, attempts
                    );
                    return Err(ResolveError::ResolutionTimeout { attempts });
                }
            };
        }
    }

    fn broadcast(&mut self, request: &[u8]) -> Result<(), ResolveError> {
        self.link.send(request).map_err(ResolveError::Transmit)
    }

    fn observe(&mut self, target_ip: Ipv4Addr) -> Result<Option<MacAddr>, ResolveError> {
        let mut found = None;
        let seen = self
            .link
            .dispatch(self.policy.frames_per_attempt, &mut |frame| {
                found = arp::match_reply(frame, target_ip);
                found.is_some()
            })
            .map_err(ResolveError::Capture)?;
        trace!("Inspected {} ARP frames", seen);
        Ok(found)
    }
}

fn parse_target(target: &str) -> Result<Ipv4Addr, ResolveError> {
    match target.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(ResolveError::UnsupportedTargetFamily(ip.to_string())),
        Err(_) => Err(ResolveError::UnsupportedTargetFamily(format!(
            "{} is not an IPv4 address",
            target
        ))),
    }
}

/// Runs `resolver` on tokio's blocking pool and gives up after `deadline`.
///
/// On success the resolver is handed back so its link can be reused. When the
/// deadline passes first the blocking resolution keeps running to completion
/// in the background and its result is dropped.
pub async fn resolve_detached<L, S>(
    mut resolver: MirrorResolver<L, S>,
    target: String,
    deadline: Duration,
) -> Result<(MirrorEndpoint, MirrorResolver<L, S>), ResolveError>
where
    L: LinkLayer + Send + 'static,
    S: Sleeper + Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || {
        let result = resolver.resolve(&target);
        (result, resolver)
    });

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok((Ok(endpoint), resolver))) => Ok((endpoint, resolver)),
        Ok(Ok((Err(e), _))) => Err(e),
        Ok(Err(e)) => Err(ResolveError::Capture(NetworkError::CaptureFailed(format!(
            "resolver task failed: {}",
            e
        )))),
        Err(_) => {
            warn!("Mirror resolution abandoned after {:?}", deadline);
            Err(ResolveError::DeadlineExceeded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::arp::ArpPacket;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const LOCAL_HW: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x10]);
    const TARGET_HW: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x20]);
    const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 1);
    const TARGET_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 2);

    /// Scripted link: each attempt's received frames are queued up front.
    #[derive(Debug)]
    struct ScriptedLink {
        sent: Vec<Vec<u8>>,
        windows: VecDeque<Vec<Vec<u8>>>,
        fail_send: bool,
        fail_capture: bool,
        delay: Duration,
    }

    impl ScriptedLink {
        fn silent() -> Self {
            Self {
                sent: Vec::new(),
                windows: VecDeque::new(),
                fail_send: false,
                fail_capture: false,
                delay: Duration::ZERO,
            }
        }

        fn answering_on(attempt: usize, frames: Vec<Vec<u8>>) -> Self {
            let mut link = Self::silent();
            for _ in 1..attempt {
                link.windows.push_back(Vec::new());
            }
            link.windows.push_back(frames);
            link
        }
    }

    impl LinkLayer for ScriptedLink {
        fn interface(&self) -> &str {
            "test0"
        }

        fn hardware_address(&self) -> Result<MacAddr, NetworkError> {
            Ok(LOCAL_HW)
        }

        fn ipv4_address(&self) -> Result<Ipv4Addr, NetworkError> {
            Ok(LOCAL_IP)
        }

        fn send(&mut self, frame: &[u8]) -> Result<(), NetworkError> {
            if self.fail_send {
                return Err(NetworkError::TransmitFailed("no carrier".to_string()));
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }

        fn dispatch(
            &mut self,
            max_frames: usize,
            on_frame: &mut dyn FnMut(&[u8]) -> bool,
        ) -> Result<usize, NetworkError> {
            if self.fail_capture {
                return Err(NetworkError::CaptureFailed("device went away".to_string()));
            }
            std::thread::sleep(self.delay);
            let mut seen = 0;
            for frame in self.windows.pop_front().unwrap_or_default() {
                if seen == max_frames {
                    break;
                }
                seen += 1;
                if on_frame(&frame) {
                    break;
                }
            }
            Ok(seen)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        naps: Rc<RefCell<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.naps.borrow_mut().push(duration);
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    fn reply(sender_hw: MacAddr, sender_ip: Ipv4Addr, eth_src: MacAddr) -> Vec<u8> {
        ArpPacket::reply(sender_hw, sender_ip, LOCAL_HW, LOCAL_IP).to_frame(eth_src, LOCAL_HW)
    }

    #[test]
    fn resolves_on_first_reply() {
        let link = ScriptedLink::answering_on(1, vec![reply(TARGET_HW, TARGET_IP, TARGET_HW)]);
        let sleeper = RecordingSleeper::default();
        let mut resolver = MirrorResolver::with_sleeper(link, sleeper.clone());

        let endpoint = resolver.resolve("198.51.100.2").unwrap();
        assert_eq!(
            endpoint,
            MirrorEndpoint {
                local_hw_addr: LOCAL_HW,
                local_ip: LOCAL_IP,
                target_hw_addr: TARGET_HW,
                target_ip: TARGET_IP,
            }
        );
        assert_eq!(resolver.link().sent.len(), 1);
        assert_eq!(
            resolver.link().sent[0],
            arp::request_frame(LOCAL_HW, LOCAL_IP, TARGET_IP)
        );
        assert!(sleeper.naps.borrow().is_empty());
    }

    #[test]
    fn skips_non_matching_frames_in_a_window() {
        let other_ip = Ipv4Addr::new(198, 51, 100, 77);
        let spoofer = MacAddr([0x02, 0, 0, 0, 0, 0x66]);
        let link = ScriptedLink::answering_on(
            1,
            vec![
                reply(spoofer, other_ip, spoofer),
                reply(TARGET_HW, TARGET_IP, spoofer),
                reply(TARGET_HW, TARGET_IP, TARGET_HW),
            ],
        );
        let mut resolver = MirrorResolver::with_sleeper(link, NoSleep);
        let endpoint = resolver.resolve("198.51.100.2").unwrap();
        assert_eq!(endpoint.target_hw_addr, TARGET_HW);
    }

    #[test]
    fn retries_until_answered() {
        let link = ScriptedLink::answering_on(4, vec![reply(TARGET_HW, TARGET_IP, TARGET_HW)]);
        let sleeper = RecordingSleeper::default();
        let mut resolver = MirrorResolver::with_sleeper(link, sleeper.clone());

        let endpoint = resolver.resolve("198.51.100.2").unwrap();
        assert_eq!(endpoint.target_hw_addr, TARGET_HW);
        assert_eq!(resolver.link().sent.len(), 4);
        assert_eq!(sleeper.naps.borrow().as_slice(), &[Duration::from_secs(1); 3]);
    }

    #[test]
    fn gives_up_after_fifty_attempts() {
        let sleeper = RecordingSleeper::default();
        let mut resolver = MirrorResolver::with_sleeper(ScriptedLink::silent(), sleeper.clone());

        let err = resolver.resolve("198.51.100.2").unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ResolutionTimeout { attempts: 50 }
        ));
        assert_eq!(resolver.link().sent.len(), 50);
        assert_eq!(sleeper.naps.borrow().len(), 49);
    }

    #[test]
    fn honours_custom_policy() {
        let policy = ResolverPolicy {
            attempts: 3,
            retry_interval: Duration::from_millis(250),
            frames_per_attempt: 1,
        };
        // The matching reply sits behind a non-matching one and is never
        // inspected with a one-frame window.
        let link = ScriptedLink::answering_on(
            1,
            vec![
                reply(TARGET_HW, Ipv4Addr::new(198, 51, 100, 9), TARGET_HW),
                reply(TARGET_HW, TARGET_IP, TARGET_HW),
            ],
        );
        let sleeper = RecordingSleeper::default();
        let mut resolver = MirrorResolver::with_sleeper(link, sleeper.clone()).with_policy(policy);

        let err = resolver.resolve("198.51.100.2").unwrap_err();
        assert!(matches!(err, ResolveError::ResolutionTimeout { attempts: 3 }));
        assert_eq!(
            sleeper.naps.borrow().as_slice(),
            &[Duration::from_millis(250); 2]
        );
    }

    #[test]
    fn rejects_non_ipv4_targets() {
        let mut resolver = MirrorResolver::with_sleeper(ScriptedLink::silent(), NoSleep);
        assert!(matches!(
            resolver.resolve("2001:db8::5"),
            Err(ResolveError::UnsupportedTargetFamily(_))
        ));
        assert!(matches!(
            resolver.resolve("mirror.example"),
            Err(ResolveError::UnsupportedTargetFamily(_))
        ));
        assert!(resolver.link().sent.is_empty());
    }

    #[test]
    fn link_failures_abort_resolution() {
        let mut link = ScriptedLink::silent();
        link.fail_send = true;
        let mut resolver = MirrorResolver::with_sleeper(link, NoSleep);
        assert!(matches!(
            resolver.resolve("198.51.100.2"),
            Err(ResolveError::Transmit(_))
        ));

        let mut link = ScriptedLink::silent();
        link.fail_capture = true;
        let mut resolver = MirrorResolver::with_sleeper(link, NoSleep);
        assert!(matches!(
            resolver.resolve("198.51.100.2"),
            Err(ResolveError::Capture(_))
        ));
        assert_eq!(resolver.link().sent.len(), 1);
    }

    #[tokio::test]
    async fn detached_resolution_returns_link() {
        let link = ScriptedLink::answering_on(2, vec![reply(TARGET_HW, TARGET_IP, TARGET_HW)]);
        let resolver = MirrorResolver::with_sleeper(link, NoSleep);

        let (endpoint, resolver) =
            resolve_detached(resolver, "198.51.100.2".to_string(), Duration::from_secs(5))
                .await
                .unwrap();
        assert_eq!(endpoint.target_hw_addr, TARGET_HW);
        assert_eq!(resolver.into_link().sent.len(), 2);
    }

    #[tokio::test]
    async fn detached_resolution_respects_deadline() {
        let mut link = ScriptedLink::silent();
        link.delay = Duration::from_millis(100);
        let policy = ResolverPolicy {
            attempts: 3,
            ..ResolverPolicy::default()
        };
        let resolver = MirrorResolver::with_sleeper(link, NoSleep).with_policy(policy);

        let err = resolve_detached(resolver, "198.51.100.2".to_string(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::DeadlineExceeded));
    }
}
