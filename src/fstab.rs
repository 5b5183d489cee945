//! fstab parsing and mounting of fstab entries.
//!
//! Lines are whitespace-separated fields; `#` starts a comment outside of
//! quotes, `"` toggles quoting and `\` escapes the next character. Lines that are
//! empty, malformed, or carry more than six fields are skipped.
use std::ffi::CString;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::Peekable;
use std::path::Path;
use std::str::{Chars, FromStr};

use log::{debug, warn};

use crate::config::Config;
use crate::mount::try_mount_fs;
use crate::types::errors::{Error, Result};
use crate::types::mount::{MountFlags, MountOptions};

/// Where the filesystem of an entry comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsSpec {
    /// A device node or any other source path, passed through as-is.
    File(String),
    /// `LABEL=<label>`
    Label(String),
    /// `UUID=<uuid>`
    Uuid(String),
}

impl FromStr for FsSpec {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if let Some(label) = s.strip_prefix("LABEL=") {
            Self::Label(label.to_string())
        } else if let Some(uuid) = s.strip_prefix("UUID=") {
            Self::Uuid(uuid.to_string())
        } else {
            Self::File(s.to_string())
        })
    }
}

impl fmt::Display for FsSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(s) => write!(f, "{s}"),
            Self::Label(s) => write!(f, "LABEL={s}"),
            Self::Uuid(s) => write!(f, "UUID={s}"),
        }
    }
}

impl FsSpec {
    /// Source string handed to `mount(2)`.
    ///
    /// Labels and UUIDs go through the udev symlink directories from `config`;
    /// the link is resolved when possible and used verbatim otherwise.
    #[must_use]
    pub fn resolve(&self, config: &Config) -> String {
        let link = match self {
            Self::File(s) => return s.clone(),
            Self::Label(l) => config.by_label_dir.join(l),
            Self::Uuid(u) => config.by_uuid_dir.join(u),
        };
        link.canonicalize()
            .unwrap_or(link)
            .to_string_lossy()
            .into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTabEntry {
    pub fs_spec: FsSpec,
    /// Mount point.
    pub fs_file: String,
    pub fs_vfstype: String,
    pub fs_mntops: Vec<String>,
    /// Whether dump(8) should back the filesystem up.
    pub fs_freq: bool,
    /// fsck order; 0 means no check.
    pub fs_passno: u32,
}

impl FsTabEntry {
    #[must_use]
    pub fn path(&self) -> &Path {
        Path::new(&self.fs_file)
    }

    /// Whether the entry takes part in boot-time mounting: not `noauto`, not swap.
    #[must_use]
    pub fn is_auto(&self) -> bool {
        self.fs_vfstype != "swap" && !self.fs_mntops.iter().any(|o| o == "noauto")
    }

    /// Interpret the entry's mount options.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the filesystem data contains a NUL byte.
    pub fn options(&self) -> Result<MountOptions> {
        parse_mount_options(self.fs_mntops.as_slice())
    }

    /// Mount the entry.
    ///
    /// # Errors
    ///
    /// Returns the mount error, or `Error::InvalidArgument` for unrepresentable options.
    pub fn mount(&self, config: &Config) -> Result<()> {
        let opts = self.options()?;
        let source = self.fs_spec.resolve(config);
        debug!(
            "mount {source} on {} type {} flags {:#x}",
            self.fs_file,
            self.fs_vfstype,
            opts.flags.bits()
        );
        try_mount_fs(
            &source,
            self.path(),
            &self.fs_vfstype,
            opts.flags,
            opts.data.as_deref(),
        )
    }
}

enum Opt {
    Set(MountFlags),
    Clear(MountFlags),
    Ignore,
    Data,
}

fn classify(word: &str) -> Opt {
    use Opt::{Clear, Data, Ignore, Set};
    match word {
        "" | "defaults" | "auto" | "noauto" | "user" | "nouser" | "users" | "owner"
        | "group" | "nofail" | "_netdev" => Ignore,
        w if w.starts_with("x-") || w.starts_with("comment=") => Ignore,
        "ro" => Set(MountFlags::RDONLY),
        "rw" => Clear(MountFlags::RDONLY),
        "nosuid" => Set(MountFlags::NOSUID),
        "suid" => Clear(MountFlags::NOSUID),
        "nodev" => Set(MountFlags::NODEV),
        "dev" => Clear(MountFlags::NODEV),
        "noexec" => Set(MountFlags::NOEXEC),
        "exec" => Clear(MountFlags::NOEXEC),
        "sync" => Set(MountFlags::SYNCHRONOUS),
        "async" => Clear(MountFlags::SYNCHRONOUS),
        "remount" => Set(MountFlags::REMOUNT),
        "mand" => Set(MountFlags::MANDLOCK),
        "nomand" => Clear(MountFlags::MANDLOCK),
        "dirsync" => Set(MountFlags::DIRSYNC),
        "noatime" => Set(MountFlags::NOATIME),
        "atime" => Clear(MountFlags::NOATIME),
        "nodiratime" => Set(MountFlags::NODIRATIME),
        "diratime" => Clear(MountFlags::NODIRATIME),
        "bind" => Set(MountFlags::BIND),
        "rbind" => Set(MountFlags::BIND | MountFlags::REC),
        "move" => Set(MountFlags::MOVE),
        "silent" => Set(MountFlags::SILENT),
        "loud" => Clear(MountFlags::SILENT),
        "relatime" => Set(MountFlags::RELATIME),
        "norelatime" => Clear(MountFlags::RELATIME),
        "strictatime" => Set(MountFlags::STRICTATIME),
        "nostrictatime" => Clear(MountFlags::STRICTATIME),
        "lazytime" => Set(MountFlags::LAZYTIME),
        "nolazytime" => Clear(MountFlags::LAZYTIME),
        "private" => Set(MountFlags::PRIVATE),
        "rprivate" => Set(MountFlags::PRIVATE | MountFlags::REC),
        "slave" => Set(MountFlags::SLAVE),
        "rslave" => Set(MountFlags::SLAVE | MountFlags::REC),
        "shared" => Set(MountFlags::SHARED),
        "rshared" => Set(MountFlags::SHARED | MountFlags::REC),
        "unbindable" => Set(MountFlags::UNBINDABLE),
        "runbindable" => Set(MountFlags::UNBINDABLE | MountFlags::REC),
        _ => Data,
    }
}

/// Split fstab mount options into the kernel flag word and filesystem data.
///
/// Later words win over earlier ones (`ro,rw` mounts read-write). Words that only
/// matter to userspace tools are dropped; unknown words are forwarded as data.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` if the data words contain a NUL byte.
pub fn parse_mount_options<S: AsRef<str>>(words: &[S]) -> Result<MountOptions> {
    let mut flags = MountFlags::empty();
    let mut data: Vec<&str> = Vec::new();
    for w in words {
        let w = w.as_ref();
        match classify(w) {
            Opt::Set(f) => flags.insert(f),
            Opt::Clear(f) => flags.remove(f),
            Opt::Ignore => {}
            Opt::Data => data.push(w),
        }
    }
    let data = if data.is_empty() {
        None
    } else {
        Some(CString::new(data.join(",")).map_err(|_| {
            Error::InvalidArgument("mount data contains a NUL byte".into())
        })?)
    };
    Ok(MountOptions { flags, data })
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

/// Read one field. `None` on a dangling escape or an unterminated quote.
fn consume_token(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut tok = String::new();
    let mut quoted = false;
    while let Some(&c) = chars.peek() {
        if !quoted && (c.is_whitespace() || c == '#') {
            break;
        }
        chars.next();
        match c {
            '"' => quoted = !quoted,
            '\\' => tok.push(chars.next()?),
            _ => tok.push(c),
        }
    }
    (!quoted).then_some(tok)
}

/// Parse a single fstab line. `None` if it holds no valid entry.
#[must_use]
pub fn parse_line(line: &str) -> Option<FsTabEntry> {
    let mut fields: Vec<String> = Vec::with_capacity(6);
    let mut chars = line.chars().peekable();
    loop {
        skip_whitespace(&mut chars);
        match chars.peek() {
            None | Some('#') => break,
            Some(_) => {}
        }
        if fields.len() == 6 {
            return None;
        }
        fields.push(consume_token(&mut chars)?);
    }
    let [spec, file, vfstype, mntops, freq, passno]: [String; 6] = fields.try_into().ok()?;
    let fs_spec = match spec.parse::<FsSpec>() {
        Ok(s) => s,
        Err(never) => match never {},
    };
    Some(FsTabEntry {
        fs_spec,
        fs_file: file,
        fs_vfstype: vfstype,
        fs_mntops: mntops.split(',').map(str::to_owned).collect(),
        fs_freq: freq != "0",
        fs_passno: passno.parse().ok()?,
    })
}

/// Parse every valid entry of the fstab at `path`.
///
/// Invalid lines, including lines that are not UTF-8, are logged and skipped.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read.
pub fn parse(path: &Path) -> Result<Vec<FsTabEntry>> {
    let reader = BufReader::new(File::open(path).map_err(Error::Io)?);
    let mut entries = Vec::new();
    for (n, raw) in reader.split(b'\n').enumerate() {
        let mut raw = raw?;
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
        let Ok(line) = String::from_utf8(raw) else {
            warn!("{}:{}: ignoring fstab line that is not UTF-8", path.display(), n + 1);
            continue;
        };
        match parse_line(&line) {
            Some(e) => entries.push(e),
            None if is_blank_or_comment(&line) => {}
            None => warn!("{}:{}: ignoring invalid fstab entry", path.display(), n + 1),
        }
    }
    Ok(entries)
}

/// Parse the fstab named by the configuration.
///
/// # Errors
///
/// See [`parse`].
pub fn parse_default(config: &Config) -> Result<Vec<FsTabEntry>> {
    parse(&config.fstab_path)
}

fn is_blank_or_comment(line: &str) -> bool {
    let t = line.trim_start();
    t.is_empty() || t.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_round_trips_through_display() {
        for s in ["/dev/sda1", "LABEL=UEFI", "UUID=5fcd5a6e"] {
            assert_eq!(s.parse::<FsSpec>().unwrap().to_string(), s);
        }
        assert_eq!("LABEL=x".parse::<FsSpec>().unwrap(), FsSpec::Label("x".into()));
    }

    #[test]
    fn line_with_all_fields() {
        let e = parse_line("/dev/sda1  /  ext4  rw,noatime  0  1").unwrap();
        assert_eq!(e.fs_spec, FsSpec::File("/dev/sda1".into()));
        assert_eq!(e.fs_file, "/");
        assert_eq!(e.fs_vfstype, "ext4");
        assert_eq!(e.fs_mntops, ["rw", "noatime"]);
        assert!(!e.fs_freq);
        assert_eq!(e.fs_passno, 1);
    }

    #[test]
    fn trailing_comment_is_ignored() {
        let e = parse_line("proc /proc proc defaults 0 0 # kernel info").unwrap();
        assert_eq!(e.fs_vfstype, "proc");
        let e = parse_line("proc /proc proc defaults 0 0#tight").unwrap();
        assert_eq!(e.fs_passno, 0);
    }

    #[test]
    fn quotes_and_escapes() {
        let e = parse_line(r#"LABEL="My Disk" /mnt/my\ disk vfat "uid=1000,gid=100" 1 2"#)
            .unwrap();
        assert_eq!(e.fs_spec, FsSpec::Label("My Disk".into()));
        assert_eq!(e.fs_file, "/mnt/my disk");
        assert_eq!(e.fs_mntops, ["uid=1000", "gid=100"]);
        assert!(e.fs_freq);
        assert_eq!(e.fs_passno, 2);
    }

    #[test]
    fn quoted_hash_is_not_a_comment() {
        let e = parse_line(r#"/dev/sdb1 "/mnt/#1" ext4 rw 0 0"#).unwrap();
        assert_eq!(e.fs_file, "/mnt/#1");
    }

    #[test]
    fn invalid_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   # only a comment").is_none());
        assert!(parse_line("/dev/sda1 / ext4 rw 0").is_none());
        assert!(parse_line("/dev/sda1 / ext4 rw 0 1 extra").is_none());
        assert!(parse_line("/dev/sda1 / ext4 rw 0 x").is_none());
        assert!(parse_line(r#"/dev/sda1 "/ ext4 rw 0 1"#).is_none());
        assert!(parse_line("/dev/sda1 / ext4 rw 0 1\\").is_none());
    }

    #[test]
    fn options_split_into_flags_and_data() {
        let o = parse_mount_options(&["defaults", "ro", "nosuid", "size=10M", "mode=755"]).unwrap();
        assert_eq!(o.flags, MountFlags::RDONLY | MountFlags::NOSUID);
        assert_eq!(o.data.as_deref().unwrap().to_str().unwrap(), "size=10M,mode=755");
    }

    #[test]
    fn later_options_win() {
        let o = parse_mount_options(&["ro", "noexec", "rw", "exec"]).unwrap();
        assert!(o.flags.is_empty());
        assert!(o.data.is_none());
    }

    #[test]
    fn userspace_only_options_are_dropped() {
        let o = parse_mount_options(&["noauto", "user", "nofail", "x-systemd.automount", "_netdev"])
            .unwrap();
        assert_eq!(o, MountOptions::default());
    }

    #[test]
    fn recursive_bind() {
        let o = parse_mount_options(&["rbind"]).unwrap();
        assert_eq!(o.flags, MountFlags::BIND | MountFlags::REC);
    }

    #[test]
    fn auto_excludes_swap_and_noauto() {
        let swap = parse_line("/dev/sda2 none swap sw 0 0").unwrap();
        assert!(!swap.is_auto());
        let manual = parse_line("/dev/sdb1 /mnt ext4 noauto,rw 0 0").unwrap();
        assert!(!manual.is_auto());
        let root = parse_line("/dev/sda1 / ext4 rw 0 1").unwrap();
        assert!(root.is_auto());
    }

    #[test]
    fn file_spec_resolves_to_itself_and_label_to_link() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config {
            by_label_dir: td.path().join("by-label"),
            ..Config::default()
        };
        assert_eq!(FsSpec::File("tmpfs".into()).resolve(&cfg), "tmpfs");
        // Missing link: used verbatim.
        assert_eq!(
            FsSpec::Label("ROOT".into()).resolve(&cfg),
            td.path().join("by-label/ROOT").to_string_lossy()
        );

        std::fs::create_dir_all(td.path().join("by-label")).unwrap();
        std::fs::write(td.path().join("sda1"), b"").unwrap();
        std::os::unix::fs::symlink("../sda1", td.path().join("by-label/ROOT")).unwrap();
        assert_eq!(
            FsSpec::Label("ROOT".into()).resolve(&cfg),
            td.path().canonicalize().unwrap().join("sda1").to_string_lossy()
        );
    }
}
