use std::fmt;
use std::time::Duration;

use flagbind::{Bindings, FlagValue, Schema, Shared, Value};
use serde::{Serialize, Serializer};

/// Congestion profile of the tunnel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    Normal,
    #[default]
    Fast,
    Fast2,
    Fast3,
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Normal => "normal",
            Mode::Fast => "fast",
            Mode::Fast2 => "fast2",
            Mode::Fast3 => "fast3",
            Mode::Manual => "manual",
        })
    }
}

impl FlagValue for Mode {
    fn set(&mut self, text: &str) -> Result<(), String> {
        *self = match text.trim() {
            "normal" => Mode::Normal,
            "fast" => Mode::Fast,
            "fast2" => Mode::Fast2,
            "fast3" => Mode::Fast3,
            "manual" => Mode::Manual,
            other => {
                return Err(format!(
                    "unknown mode `{other}` (expected normal, fast, fast2, fast3 or manual)"
                ));
            }
        };
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
pub struct TunnelConfig {
    pub listen: String,
    pub target: String,
    pub key: String,
    pub crypt: String,
    #[serde(serialize_with = "serialize_mode")]
    pub mode: Option<Shared<Mode>>,
    pub conn: usize,
    pub autoexpire: isize,
    pub mtu: isize,
    pub sndwnd: isize,
    pub rcvwnd: isize,
    pub datashard: isize,
    pub parityshard: isize,
    pub dscp: isize,
    pub sockbuf: i64,
    pub smuxbuf: u64,
    pub ratio: f64,
    pub nocomp: bool,
    pub acknodelay: bool,
    #[serde(serialize_with = "serialize_duration")]
    pub keepalive: Duration,
    pub ports: Vec<isize>,
    pub shards: Vec<i64>,
    pub peers: Vec<String>,
    pub log: String,
    pub quiet: bool,
    pub pprof: bool,
    /// Filled by the host, never from flags.
    pub session: String,
}

impl Schema for TunnelConfig {
    fn bind(b: &mut Bindings<Self>) {
        b.field("listen", |c| &mut c.listen).tag(
            r#"name:"listen,l" value:":29900" env:"LISTEN_ADDR" usage:"local listen address""#,
        );
        b.field("target", |c| &mut c.target).tag(
            r#"name:"target,t" value:"vps:29900" env:"TARGET_ADDR" usage:"server address""#,
        );
        b.field("key", |c| &mut c.key).tag(
            r#"name:"key" value:"it's a secret" env:"TUNNEL_KEY" usage:"pre-shared secret""#,
        );
        b.field("crypt", |c| &mut c.crypt)
            .name("crypt")
            .value("aes")
            .usage("aes, aes-128, aes-192, salsa20, blowfish, twofish, xor, none");
        b.field("mode", |c| &mut c.mode)
            .name("mode")
            .value("fast")
            .env("TUNNEL_MODE")
            .usage("profiles: fast3, fast2, fast, normal, manual");
        b.field("conn", |c| &mut c.conn)
            .name("conn")
            .value("1")
            .usage("number of UDP connections to server");
        b.field("autoexpire", |c| &mut c.autoexpire)
            .name("autoexpire")
            .value("0")
            .usage("seconds before a UDP connection is replaced, 0 to disable");
        b.field("mtu", |c| &mut c.mtu)
            .name("mtu")
            .value("1350")
            .usage("set maximum transmission unit for UDP packets");
        b.field("sndwnd", |c| &mut c.sndwnd)
            .name("sndwnd")
            .value("128")
            .usage("set send window size(num of packets)");
        b.field("rcvwnd", |c| &mut c.rcvwnd)
            .name("rcvwnd")
            .value("512")
            .usage("set receive window size(num of packets)");
        b.field("datashard", |c| &mut c.datashard)
            .name("datashard,ds")
            .value("10")
            .usage("set reed-solomon erasure coding - datashard");
        b.field("parityshard", |c| &mut c.parityshard)
            .name("parityshard,ps")
            .value("3")
            .usage("set reed-solomon erasure coding - parityshard");
        b.field("dscp", |c| &mut c.dscp)
            .name("dscp")
            .value("0")
            .usage("set DSCP(6bit)");
        b.field("sockbuf", |c| &mut c.sockbuf)
            .name("sockbuf")
            .value("4194304")
            .usage("per-socket buffer in bytes");
        b.field("smuxbuf", |c| &mut c.smuxbuf)
            .name("smuxbuf")
            .value("0x400000")
            .usage("the overall de-mux buffer in bytes");
        b.field("ratio", |c| &mut c.ratio)
            .name("ratio")
            .value("0.5")
            .usage("fraction of the window reserved for retransmits");
        b.field("nocomp", |c| &mut c.nocomp)
            .name("nocomp")
            .value("true")
            .usage("disable compression");
        b.field("acknodelay", |c| &mut c.acknodelay)
            .name("acknodelay")
            .usage("flush ack immediately when a packet is received")
            .hidden(true);
        b.field("keepalive", |c| &mut c.keepalive)
            .name("keepalive")
            .value("10s")
            .usage("heartbeat interval");
        b.field("ports", |c| &mut c.ports)
            .name("ports")
            .usage("extra local ports to forward");
        b.field("shards", |c| &mut c.shards)
            .name("shards")
            .value("1000,200,3000")
            .usage("fec shard group sizes");
        b.field("peers", |c| &mut c.peers)
            .name("peers")
            .env("TUNNEL_PEERS")
            .usage("fallback server addresses");
        b.field("log", |c| &mut c.log)
            .name("log")
            .usage("specify a log file to output, default goes to stderr");
        b.field("quiet", |c| &mut c.quiet)
            .name("quiet,q")
            .usage("to suppress the 'stream open/close' messages");
        b.field("pprof", |c| &mut c.pprof)
            .tag(r#"name:"pprof" usage:"start profiling server on :6060" hidden:"true""#);
        b.field("session", |c| &mut c.session);
    }
}

fn serialize_mode<S: Serializer>(mode: &Option<Shared<Mode>>, s: S) -> Result<S::Ok, S::Error> {
    match mode {
        Some(mode) => s.collect_str(&*mode.borrow()),
        None => s.serialize_none(),
    }
}

/// Durations render as `2m 40s`, the same form `--keepalive` accepts.
fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&Value::Duration(*d))
}
