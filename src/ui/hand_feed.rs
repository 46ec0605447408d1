/// Hand-landmark input sources.
///
/// Landmarks come from an external detector as JSON, one frame at a time:
///
///   {"landmarks": [{"x": 0.51, "y": 0.42, "z": -0.03}, ... 21 points]}
///
/// `{"landmarks": null}` or `{}` is a frame with no hand. Extra fields are ignored.
/// Anything unparsable or geometrically invalid also reads as no hand.
///
/// Two sources:
///   - `UdpFeed`   : the detector sends one datagram per camera frame
///   - `ReplayFeed`: a JSON-lines recording played back at a fixed rate

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{LandmarkConfig, LandmarkSourceKind};
use crate::domain::landmark::{HandObservation, Landmark};

/// Larger than any 21-point frame the detector sends.
const MAX_DATAGRAM: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("could not bind landmark socket {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read replay file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("replay file {path} has no frames")]
    EmptyReplay { path: PathBuf },
}

pub trait LandmarkSource {
    /// The newest observation since the last call, or `None` if no frame is due.
    fn poll(&mut self, now_ms: u64) -> Option<HandObservation>;
    fn name(&self) -> String;
}

/// Open the configured source. `Ok(None)` when hand input is switched off.
pub fn open_source(cfg: &LandmarkConfig) -> Result<Option<Box<dyn LandmarkSource>>, FeedError> {
    let source: Box<dyn LandmarkSource> = match &cfg.source {
        LandmarkSourceKind::None => return Ok(None),
        LandmarkSourceKind::Udp(addr) => Box::new(UdpFeed::bind(*addr)?),
        LandmarkSourceKind::Replay(path) => {
            Box::new(ReplayFeed::open(path, cfg.replay_frame_ms, cfg.replay_loop)?)
        }
    };
    info!("landmark source: {}", source.name());
    Ok(Some(source))
}

// ══════════════════════════════════════════════════════════════
// Wire format
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct WireFrame {
    #[serde(default)]
    landmarks: Option<Vec<WirePoint>>,
}

#[derive(Deserialize)]
struct WirePoint {
    x: f32,
    y: f32,
    #[serde(default)]
    z: Option<f32>,
}

/// Decode one frame.
pub fn parse_frame(bytes: &[u8]) -> HandObservation {
    let frame: WireFrame = match serde_json::from_slice(bytes) {
        Ok(f) => f,
        Err(e) => {
            debug!("bad landmark frame: {e}");
            return HandObservation::Absent;
        }
    };
    let Some(points) = frame.landmarks else {
        return HandObservation::Absent;
    };
    let points: Vec<Landmark> = points.iter()
        .map(|p| Landmark { x: p.x, y: p.y, z: p.z })
        .collect();
    let obs = HandObservation::from_points(&points);
    if obs == HandObservation::Absent {
        debug!("rejected landmark frame with {} points", points.len());
    }
    obs
}

// ══════════════════════════════════════════════════════════════
// UDP feed
// ══════════════════════════════════════════════════════════════

pub struct UdpFeed {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpFeed {
    pub fn bind(addr: SocketAddr) -> Result<Self, FeedError> {
        let socket = UdpSocket::bind(addr).map_err(|source| FeedError::Bind { addr, source })?;
        socket.set_nonblocking(true).map_err(|source| FeedError::Bind { addr, source })?;
        Ok(UdpFeed { socket, buf: vec![0; MAX_DATAGRAM] })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr().ok()
    }
}

impl LandmarkSource for UdpFeed {
    /// Drains every pending datagram; only the newest one is decoded.
    fn poll(&mut self, _now_ms: u64) -> Option<HandObservation> {
        let mut newest: Option<Vec<u8>> = None;
        loop {
            match self.socket.recv_from(&mut self.buf) {
                Ok((n, _)) => newest = Some(self.buf[..n].to_vec()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("landmark socket: {e}");
                    break;
                }
            }
        }
        newest.map(|bytes| parse_frame(&bytes))
    }

    fn name(&self) -> String {
        match self.local_addr() {
            Some(addr) => format!("udp {addr}"),
            None => "udp".into(),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Replay feed
// ══════════════════════════════════════════════════════════════

pub struct ReplayFeed {
    path: PathBuf,
    frames: Vec<String>,
    next: usize,
    frame_ms: u64,
    looping: bool,
    next_due: Option<u64>,
    finished: bool,
}

impl ReplayFeed {
    pub fn open(path: &Path, frame_ms: u64, looping: bool) -> Result<Self, FeedError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| FeedError::Open { path: path.to_path_buf(), source })?;
        let frames: Vec<String> = text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        if frames.is_empty() {
            return Err(FeedError::EmptyReplay { path: path.to_path_buf() });
        }
        debug!("replay {}: {} frames", path.display(), frames.len());
        Ok(ReplayFeed {
            path: path.to_path_buf(),
            frames,
            next: 0,
            frame_ms: frame_ms.max(1),
            looping,
            next_due: None,
            finished: false,
        })
    }
}

impl LandmarkSource for ReplayFeed {
    /// One recorded frame per `frame_ms`. A finished, non-looping replay
    /// reports the hand gone once and then stays silent.
    fn poll(&mut self, now_ms: u64) -> Option<HandObservation> {
        if self.finished {
            return None;
        }
        let due = *self.next_due.get_or_insert(now_ms);
        if now_ms < due {
            return None;
        }

        if self.next >= self.frames.len() {
            if !self.looping {
                info!("replay {} finished", self.path.display());
                self.finished = true;
                return Some(HandObservation::Absent);
            }
            self.next = 0;
        }

        let obs = parse_frame(self.frames[self.next].as_bytes());
        self.next += 1;
        // Fell behind (slow frame): resync rather than bursting frames.
        let following = due + self.frame_ms;
        self.next_due = Some(if following <= now_ms { now_ms + self.frame_ms } else { following });
        Some(obs)
    }

    fn name(&self) -> String {
        format!("replay {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_json(x: f32, pinched: bool) -> String {
        let mut pts: Vec<String> = (0..21).map(|_| format!("{{\"x\":{x},\"y\":0.5}}")).collect();
        if !pinched {
            pts[8] = "{\"x\":0.9,\"y\":0.9,\"z\":0.0}".into();
        }
        format!("{{\"landmarks\":[{}],\"handedness\":\"Right\"}}", pts.join(","))
    }

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pinch2048-feed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_full_frame() {
        let obs = parse_frame(frame_json(0.3, false).as_bytes());
        let hand = obs.hand().expect("hand present");
        assert!((hand.point(0).x - 0.3).abs() < 1e-6);
        assert_eq!(hand.point(0).z, None);
        assert_eq!(hand.point(8).z, Some(0.0));
    }

    #[test]
    fn no_hand_forms() {
        assert_eq!(parse_frame(b"{\"landmarks\":null}"), HandObservation::Absent);
        assert_eq!(parse_frame(b"{}"), HandObservation::Absent);
        assert_eq!(parse_frame(b"{\"landmarks\":[]}"), HandObservation::Absent);
    }

    #[test]
    fn malformed_frames_read_as_no_hand() {
        assert_eq!(parse_frame(b"not json"), HandObservation::Absent);
        assert_eq!(parse_frame(b"{\"landmarks\":[{\"x\":\"a\",\"y\":1}]}"), HandObservation::Absent);
        // 21 points, one out of range.
        let bad = frame_json(0.5, true).replacen("\"x\":0.5", "\"x\":1.5", 1);
        assert_eq!(parse_frame(bad.as_bytes()), HandObservation::Absent);
    }

    #[test]
    fn replay_paces_frames() {
        let content = format!("{}\n\n{}\n", frame_json(0.2, true), frame_json(0.4, true));
        let path = temp_file("paced.jsonl", &content);
        let mut feed = ReplayFeed::open(&path, 33, false).unwrap();

        let first = feed.poll(1000).expect("first frame immediately");
        assert!((first.hand().unwrap().point(0).x - 0.2).abs() < 1e-6);
        assert!(feed.poll(1010).is_none());
        let second = feed.poll(1033).expect("second frame on schedule");
        assert!((second.hand().unwrap().point(0).x - 0.4).abs() < 1e-6);
        // End of recording: hand disappears once, then silence.
        assert_eq!(feed.poll(1066), Some(HandObservation::Absent));
        assert_eq!(feed.poll(2000), None);
    }

    #[test]
    fn replay_loops() {
        let path = temp_file("loop.jsonl", &format!("{}\n", frame_json(0.6, true)));
        let mut feed = ReplayFeed::open(&path, 10, true).unwrap();
        for i in 0..5 {
            let obs = feed.poll(i * 10).expect("frame every tick");
            assert!(obs.hand().is_some());
        }
    }

    #[test]
    fn replay_open_errors() {
        let missing = std::env::temp_dir().join("pinch2048-no-such-replay.jsonl");
        assert!(matches!(ReplayFeed::open(&missing, 33, false), Err(FeedError::Open { .. })));
        let empty = temp_file("empty.jsonl", "\n# comment\n");
        assert!(matches!(ReplayFeed::open(&empty, 33, false), Err(FeedError::EmptyReplay { .. })));
    }

    #[test]
    fn udp_feed_keeps_newest_datagram() {
        let mut feed = UdpFeed::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = feed.local_addr().unwrap();
        assert_eq!(feed.poll(0), None);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"{\"landmarks\":null}", addr).unwrap();
        sender.send_to(frame_json(0.5, true).as_bytes(), addr).unwrap();

        let mut got_hand = false;
        for _ in 0..100 {
            if let Some(obs) = feed.poll(0) {
                if obs.hand().is_some() {
                    got_hand = true;
                    break;
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(got_hand);
    }

    #[test]
    fn demo_recording_yields_four_swipes() {
        use crate::config::GestureConfig;
        use crate::domain::bounds::GameBounds;
        use crate::domain::grid::Direction;
        use crate::sim::gesture::GestureController;

        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/swipes.jsonl");
        let mut feed = ReplayFeed::open(&path, 33, false).unwrap();
        let bounds = GameBounds::centered(1280.0, 720.0, 500.0, 80.0);
        let mut gestures = GestureController::new(GestureConfig::default(), 1280.0, 720.0);

        let mut dirs = vec![];
        let mut t = 0;
        while let Some(obs) = feed.poll(t) {
            if let Some(dir) = gestures.update(&obs, &bounds, t).command {
                dirs.push(dir);
                gestures.lock();
            }
            t += 33;
        }
        assert_eq!(dirs, vec![Direction::Right, Direction::Down, Direction::Left, Direction::Up]);
    }

    #[test]
    fn none_source_opens_nothing() {
        let cfg = LandmarkConfig { source: LandmarkSourceKind::None, replay_frame_ms: 33, replay_loop: false };
        assert!(open_source(&cfg).unwrap().is_none());
    }
}
