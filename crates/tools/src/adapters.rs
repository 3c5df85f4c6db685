//! Adapter table: tool name → command template + auth-injection style.
//!
//! The table is declared at compile time. Names are the decision engine's
//! vocabulary and are validated once at startup, so an unknown name fails
//! fast instead of at invocation time.

use watchtower_core::error::ToolError;
use watchtower_core::state::AuthMetadata;

/// Placeholder replaced by the run's primary target in argument templates.
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// How an adapter accepts auth metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// Auth metadata is ignored.
    None,
    /// HTTP probing tools: every pair becomes `<flag> "key: value"`.
    Header { flag: &'static str },
    /// SQL-injection tools: a `cookie` key becomes `--cookie=value`,
    /// anything else `--headers=key: value`.
    SqlInjection,
}

/// A fixed mapping from a tool name to its external command shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAdapter {
    /// Stable name used by the decision engine and the registry
    pub name: &'static str,

    /// Executable to invoke
    pub program: &'static str,

    /// Argument template; `{target}` is substituted
    pub args: &'static [&'static str],

    /// Auth metadata injection
    pub auth: AuthStyle,

    /// Other executable names the same tool ships under
    pub aliases: &'static [&'static str],
}

impl ToolAdapter {
    pub fn supports_auth(&self) -> bool {
        self.auth != AuthStyle::None
    }

    /// Every executable name this tool may be installed as.
    pub fn executables(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.program).chain(self.aliases.iter().copied())
    }

    /// Build the full argv for `target`, program first.
    pub fn build_command(&self, target: &str, auth: &AuthMetadata) -> Vec<String> {
        self.build_command_with(self.program, target, auth)
    }

    /// Same as [`build_command`](Self::build_command) with an explicit executable.
    pub fn build_command_with(&self, executable: &str, target: &str, auth: &AuthMetadata) -> Vec<String> {
        let mut command = Vec::with_capacity(1 + self.args.len() + auth.len() * 2);
        command.push(executable.to_string());
        command.extend(self.args.iter().map(|a| a.replace(TARGET_PLACEHOLDER, target)));

        match self.auth {
            AuthStyle::None => {}
            AuthStyle::Header { flag } => {
                for (key, value) in auth {
                    command.push(flag.to_string());
                    command.push(format!("{key}: {value}"));
                }
            }
            AuthStyle::SqlInjection => {
                for (key, value) in auth {
                    if key.eq_ignore_ascii_case("cookie") {
                        command.push(format!("--cookie={value}"));
                    } else {
                        command.push(format!("--headers={key}: {value}"));
                    }
                }
            }
        }
        command
    }
}

const fn adapter(
    name: &'static str,
    program: &'static str,
    args: &'static [&'static str],
    auth: AuthStyle,
) -> ToolAdapter {
    ToolAdapter { name, program, args, auth, aliases: &[] }
}

const H: AuthStyle = AuthStyle::Header { flag: "-H" };
const HEADERS: AuthStyle = AuthStyle::Header { flag: "--headers" };

/// Every built-in adapter, in the order tools are offered to the operator.
pub static BUILTIN_ADAPTERS: &[ToolAdapter] = &[
    adapter("nmap", "nmap", &["-sV", "-sC", "-A", "-Pn", "-T4", "{target}"], AuthStyle::None),
    adapter("masscan", "masscan", &["-p1-65535", "--rate", "1000", "{target}"], AuthStyle::None),
    adapter("httpx", "httpx", &["{target}", "-m", "GET", "--follow-redirects"], AuthStyle::None),
    adapter("whatweb", "whatweb", &["-a", "3", "{target}"], AuthStyle::Header { flag: "--header" }),
    adapter("wafw00f", "wafw00f", &["-a", "{target}"], AuthStyle::None),
    adapter("subfinder", "subfinder", &["-d", "{target}", "-silent", "-all"], AuthStyle::None),
    adapter("amass", "amass", &["enum", "-d", "{target}"], AuthStyle::None),
    adapter("dnsrecon", "dnsrecon", &["-d", "{target}"], AuthStyle::None),
    adapter("nuclei", "nuclei", &["-u", "{target}", "-silent"], H),
    adapter("nikto", "nikto", &["-h", "{target}", "-maxtime", "5m"], AuthStyle::None),
    adapter(
        "sqlmap",
        "sqlmap",
        &["-u", "{target}", "--batch", "--random-agent", "--level=2", "--risk=2", "--crawl=2"],
        AuthStyle::SqlInjection,
    ),
    adapter(
        "wpscan",
        "wpscan",
        &["--url", "{target}", "--no-banner", "--random-user-agent", "--enumerate", "vp,vt,tt,cb,dbe,u,m"],
        HEADERS,
    ),
    ToolAdapter {
        name: "testssl",
        program: "testssl.sh",
        args: &["{target}"],
        auth: AuthStyle::None,
        aliases: &["testssl"],
    },
    adapter("sslyze", "sslyze", &["{target}"], AuthStyle::None),
    adapter("gobuster", "gobuster", &["dir", "-u", "{target}", "-w", "wordlist.txt"], H),
    adapter("ffuf", "ffuf", &["-u", "{target}/FUZZ", "-w", "wordlist.txt", "-t", "40", "-c"], H),
    adapter("arjun", "arjun", &["-u", "{target}", "-t", "10", "-T", "5"], HEADERS),
    adapter("xsstrike", "xsstrike", &["-u", "{target}"], HEADERS),
    adapter("gitleaks", "gitleaks", &["detect", "-v"], AuthStyle::None),
    adapter("cmseek", "cmseek", &["-u", "{target}", "--batch", "--random-agent"], AuthStyle::None),
    adapter("retire", "retire", &["--site", "{target}", "--outputformat", "text"], AuthStyle::None),
    adapter("dalfox", "dalfox", &["url", "{target}"], H),
    ToolAdapter {
        name: "kiterunner",
        program: "kr",
        args: &["scan", "{target}", "-A=apiroutes-2202"],
        auth: H,
        aliases: &["kiterunner"],
    },
];

/// Lookup over a static adapter table.
#[derive(Debug, Clone, Copy)]
pub struct AdapterRegistry {
    adapters: &'static [ToolAdapter],
}

impl AdapterRegistry {
    pub fn new(adapters: &'static [ToolAdapter]) -> Self {
        Self { adapters }
    }

    /// The registry of every built-in adapter.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_ADAPTERS)
    }

    /// Get an adapter by name.
    pub fn get(&self, name: &str) -> Result<&'static ToolAdapter, ToolError> {
        self.adapters
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// All adapter names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.name).collect()
    }

    pub fn adapters(&self) -> &'static [ToolAdapter] {
        self.adapters
    }

    /// Fail on the first name with no adapter.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Result<(), ToolError> {
        for name in names {
            self.get(name.as_ref())?;
        }
        Ok(())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
