#![allow(dead_code)]

use routeros_exporter::routeros::proto::{read_sentence, write_sentence};
use routeros_exporter::routeros::challenge_response;
use routeros_exporter::Device;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const USER: &str = "admin";
pub const PASSWORD: &str = "secret";
const CHALLENGE: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

pub type Record = Vec<(&'static str, &'static str)>;

/// A canned answer: `!re` records, then a `!done` that may carry `=ret=`.
#[derive(Clone, Default)]
pub struct ScriptedReply {
    pub records: Vec<Record>,
    pub ret: Option<&'static str>,
}

/// What a mock device answers.
#[derive(Clone)]
pub struct DeviceScript {
    pub identity: String,
    /// Answer the first `/login` with a challenge like pre-6.43 firmware
    pub legacy_login: bool,
    pub interfaces: Vec<Vec<(&'static str, &'static str)>>,
    pub resource: Vec<(&'static str, &'static str)>,
    /// Commands answered with a `!trap`
    pub failing: HashSet<&'static str>,
    /// Further commands, keyed by command word
    pub replies: HashMap<&'static str, ScriptedReply>,
}

impl Default for DeviceScript {
    fn default() -> Self {
        Self {
            identity: "core-router".to_string(),
            legacy_login: false,
            interfaces: vec![vec![
                ("name", "ether1"),
                ("type", "ether"),
                ("disabled", "false"),
                ("comment", "uplink"),
                ("rx-byte", "1000"),
                ("tx-byte", "2000"),
                ("rx-packet", "10"),
                ("tx-packet", "20"),
                ("rx-error", "0"),
                ("tx-error", "0"),
                ("rx-drop", "0"),
                ("tx-drop", "0"),
            ]],
            resource: vec![
                ("free-memory", "100"),
                ("total-memory", "200"),
                ("cpu-load", "5"),
                ("free-hdd-space", "300"),
                ("total-hdd-space", "400"),
                ("uptime", "1d2h3m4s"),
                ("board-name", "RB4011"),
                ("version", "7.1"),
            ],
            failing: HashSet::new(),
            replies: HashMap::new(),
        }
    }
}

impl DeviceScript {
    pub fn legacy(mut self) -> Self {
        self.legacy_login = true;
        self
    }

    pub fn failing(mut self, command: &'static str) -> Self {
        self.failing.insert(command);
        self
    }

    pub fn reply(mut self, command: &'static str, records: Vec<Record>) -> Self {
        self.replies.insert(command, ScriptedReply { records, ret: None });
        self
    }

    pub fn reply_ret(mut self, command: &'static str, ret: &'static str) -> Self {
        self.replies.insert(
            command,
            ScriptedReply {
                records: Vec::new(),
                ret: Some(ret),
            },
        );
        self
    }

    /// A router answering every optional collector's queries.
    pub fn full_router() -> Self {
        Self::default()
            .reply(
                "/routing/bgp/peer/print",
                vec![
                    vec![
                        ("name", "upstream"),
                        ("remote-as", "65001"),
                        ("state", "established"),
                        ("prefix-count", "812"),
                        ("updates-sent", "5"),
                        ("updates-received", "7"),
                        ("withdrawn-sent", "0"),
                        ("withdrawn-received", "1"),
                    ],
                    vec![
                        ("name", "backup"),
                        ("remote-as", "65002"),
                        ("state", "idle"),
                        ("prefix-count", ""),
                    ],
                ],
            )
            .reply("/ip/dhcp-server/print", vec![vec![("name", "lan")]])
            .reply_ret("/ip/dhcp-server/lease/print =count-only=", "42")
            .reply(
                "/ip/dhcp-server/lease/print",
                vec![vec![
                    ("active-mac-address", "AA:BB:CC:DD:EE:FF"),
                    ("server", "lan"),
                    ("status", "bound"),
                    ("expires-after", "9m30s"),
                    ("active-address", "10.0.0.50"),
                    ("host-name", "laptop"),
                ]],
            )
            .reply(
                "/system/routerboard/print",
                vec![vec![
                    ("board-name", "RB4011"),
                    ("model", "RB4011iGS+"),
                    ("serial-number", "ABC123"),
                    ("current-firmware", "6.49"),
                    ("upgrade-firmware", "7.1"),
                ]],
            )
            .reply("/interface/wireless/print", vec![vec![("name", "wlan1")]])
            .reply(
                "/interface/wireless/monitor",
                vec![vec![
                    ("channel", "5180/20-Ceee/ac"),
                    ("registered-clients", "3"),
                    ("noise-floor", "-105"),
                    ("overall-tx-ccq", "90"),
                ]],
            )
            .reply(
                "/interface/wireless/registration-table/print",
                vec![vec![
                    ("interface", "wlan1"),
                    ("mac-address", "11:22:33:44:55:66"),
                    ("signal-to-noise", "40"),
                    ("signal-strength", "-65@HT20-7"),
                    ("packets", "100,200"),
                    ("bytes", "1000,2000"),
                    ("frames", "10,20"),
                ]],
            )
            .reply(
                "/ip/route/print",
                vec![vec![
                    ("dst-address", "0.0.0.0/0"),
                    ("gateway", "10.0.0.1"),
                    ("distance", "1"),
                    ("pref-src", ""),
                ]],
            )
    }
}

/// A RouterOS API endpoint on a loopback port.
pub struct MockDevice {
    pub addr: SocketAddr,
    commands: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<Vec<String>>>>,
    handle: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start(script: DeviceScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(script);

        let counter = Arc::clone(&commands);
        let log = Arc::clone(&received);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = Arc::clone(&script);
                let counter = Arc::clone(&counter);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = serve_connection(stream, &script, &counter, &log).await;
                });
            }
        });

        Self {
            addr,
            commands,
            received,
            handle,
        }
    }

    /// A static device entry pointing at this endpoint.
    pub fn device(&self, name: &str) -> Device {
        Device {
            name: name.to_string(),
            address: self.addr.ip().to_string(),
            srv: None,
            user: USER.to_string(),
            password: PASSWORD.to_string(),
            port: Some(self.addr.port()),
        }
    }

    /// Number of commands received over all connections.
    pub fn commands(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }

    /// Every sentence received starting with `command`.
    pub fn received(&self, command: &str) -> Vec<Vec<String>> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|words| words.first().map(String::as_str) == Some(command))
            .cloned()
            .collect()
    }
}

/// A device that accepts connections and never answers.
pub struct MuteDevice {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl MuteDevice {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        Self { addr, handle }
    }

    pub fn device(&self, name: &str) -> Device {
        Device {
            name: name.to_string(),
            address: self.addr.ip().to_string(),
            srv: None,
            user: USER.to_string(),
            password: PASSWORD.to_string(),
            port: Some(self.addr.port()),
        }
    }
}

impl Drop for MuteDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn attr(key: &str, value: &str) -> String {
    format!("={}={}", key, value)
}

fn get<'a>(words: &'a [String], key: &str) -> Option<&'a str> {
    let prefix = format!("={}=", key);
    words.iter().find_map(|w| w.strip_prefix(prefix.as_str()))
}

async fn record(stream: &mut TcpStream, props: &[(&str, &str)]) -> routeros_exporter::Result<()> {
    let mut words = vec!["!re".to_string()];
    words.extend(props.iter().map(|(k, v)| attr(k, v)));
    write_sentence(stream, &words).await
}

async fn done(stream: &mut TcpStream) -> routeros_exporter::Result<()> {
    write_sentence(stream, &["!done"]).await
}

async fn trap(stream: &mut TcpStream, message: &str) -> routeros_exporter::Result<()> {
    write_sentence(stream, &["!trap".to_string(), attr("message", message)]).await?;
    done(stream).await
}

async fn serve_connection(
    mut stream: TcpStream,
    script: &DeviceScript,
    commands: &AtomicUsize,
    received: &Mutex<Vec<Vec<String>>>,
) -> routeros_exporter::Result<()> {
    let mut authenticated = false;
    loop {
        let words = read_sentence(&mut stream).await?;
        let Some(command) = words.first().cloned() else {
            continue;
        };
        commands.fetch_add(1, Ordering::SeqCst);
        received.lock().unwrap().push(words.clone());

        if command == "/login" {
            authenticated = login(&mut stream, script, &words).await?;
            continue;
        }
        if !authenticated {
            write_sentence(&mut stream, &["!fatal", "not logged in"]).await?;
            return Ok(());
        }
        if script.failing.contains(command.as_str()) {
            trap(&mut stream, "no such command").await?;
            continue;
        }

        match command.as_str() {
            "/system/identity/print" => {
                record(&mut stream, &[("name", script.identity.as_str())]).await?;
                done(&mut stream).await?;
            }
            "/interface/print" => {
                for props in &script.interfaces {
                    record(&mut stream, props).await?;
                }
                done(&mut stream).await?;
            }
            "/system/resource/print" => {
                record(&mut stream, &script.resource).await?;
                done(&mut stream).await?;
            }
            _ => {
                let key = if words.iter().any(|w| w == "=count-only=") {
                    format!("{} =count-only=", command)
                } else {
                    command.clone()
                };
                match script.replies.get(key.as_str()) {
                    Some(reply) => {
                        for props in &reply.records {
                            record(&mut stream, props).await?;
                        }
                        match reply.ret {
                            Some(ret) => {
                                write_sentence(&mut stream, &["!done".to_string(), attr("ret", ret)])
                                    .await?
                            }
                            None => done(&mut stream).await?,
                        }
                    }
                    None => trap(&mut stream, "no such command").await?,
                }
            }
        }
    }
}

async fn login(
    stream: &mut TcpStream,
    script: &DeviceScript,
    words: &[String],
) -> routeros_exporter::Result<bool> {
    if get(words, "name") != Some(USER) {
        trap(stream, "invalid user name or password").await?;
        return Ok(false);
    }

    if let Some(response) = get(words, "response") {
        if response == challenge_response(&CHALLENGE, PASSWORD) {
            done(stream).await?;
            return Ok(true);
        }
        trap(stream, "invalid user name or password").await?;
        return Ok(false);
    }

    if script.legacy_login {
        let ret = attr("ret", &hex::encode(CHALLENGE));
        write_sentence(stream, &["!done".to_string(), ret]).await?;
        return Ok(false);
    }

    if get(words, "password") == Some(PASSWORD) {
        done(stream).await?;
        Ok(true)
    } else {
        trap(stream, "invalid user name or password").await?;
        Ok(false)
    }
}
