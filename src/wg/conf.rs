use std::fmt;
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::Path;

/// Comment line that introduces a managed peer block.
pub const MARKER: &str = "# Device: ";

/// Managed peer block: marker line through the terminating blank line.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceBlock {
    pub name: String,
    lines: Vec<String>,
}

impl DeviceBlock {
    fn field(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            if k.trim() == key {
                Some(v.trim())
            } else {
                None
            }
        })
    }

    pub fn public_key(&self) -> Option<&str> {
        self.field("PublicKey")
    }

    pub fn allowed_ips(&self) -> Option<&str> {
        self.field("AllowedIPs")
    }

    /// Host address from a `<ip>/32` AllowedIPs entry.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.allowed_ips()?.split('/').next()?.trim().parse().ok()
    }

    fn closed(&self) -> bool {
        self.lines.last().is_some_and(|line| is_blank(line))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Line(String),
    Device(DeviceBlock),
}

/// WireGuard server configuration split into unmanaged lines and device blocks.
///
/// Every line keeps its original line ending, so an unmodified config serializes back byte for byte.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    segments: Vec<Segment>,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn marker_name(line: &str) -> Option<&str> {
    line.trim_end_matches(['\n', '\r']).strip_prefix(MARKER)
}

impl ServerConfig {
    pub fn parse(content: &str) -> Self {
        let mut segments = Vec::new();
        let mut current: Option<DeviceBlock> = None;

        for line in content.split_inclusive('\n') {
            if let Some(name) = marker_name(line) {
                if let Some(block) = current.take() {
                    segments.push(Segment::Device(block));
                }
                current = Some(DeviceBlock {
                    name: name.to_string(),
                    lines: vec![line.to_string()],
                });
                continue;
            }

            match current.as_mut() {
                Some(block) => {
                    block.lines.push(line.to_string());
                    if is_blank(line) {
                        segments.extend(current.take().map(Segment::Device));
                    }
                }
                None => segments.push(Segment::Line(line.to_string())),
            }
        }
        segments.extend(current.map(Segment::Device));

        Self { segments }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|content| Self::parse(&content))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_string())
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .flat_map(|segment| match segment {
                Segment::Line(line) => std::slice::from_ref(line).iter(),
                Segment::Device(block) => block.lines.iter(),
            })
            .map(String::as_str)
    }

    /// Device names in file order, one per marker line.
    pub fn device_names(&self) -> Vec<String> {
        self.lines()
            .filter_map(marker_name)
            .map(str::to_string)
            .collect()
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceBlock> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Device(block) => Some(block),
            Segment::Line(_) => None,
        })
    }

    pub fn device(&self, name: &str) -> Option<&DeviceBlock> {
        self.devices().find(|block| block.name == name)
    }

    /// Append a peer block separated from the previous content by exactly one blank line.
    pub fn push_device(&mut self, name: &str, public_key: &str, ip: Ipv4Addr) {
        let mut needs_separator = false;
        if let Some(last) = self.last_line_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
            needs_separator = !is_blank(last);
        }
        if needs_separator {
            self.segments.push(Segment::Line("\n".to_string()));
        }

        self.segments.push(Segment::Device(DeviceBlock {
            name: name.to_string(),
            lines: vec![
                format!("{}{}\n", MARKER, name),
                "[Peer]\n".to_string(),
                format!("PublicKey = {}\n", public_key),
                format!("AllowedIPs = {}/32\n", ip),
                "\n".to_string(),
            ],
        }));
    }

    /// Drop every line from a marker naming `name` through the next blank line, or to the end of
    /// the file when none follows. Other markers in that range go too. Returns the number of
    /// matched markers.
    pub fn remove_device(&mut self, name: &str) -> usize {
        let mut dropped = 0;
        let mut skipping = false;
        let mut kept = String::new();
        for line in self.lines() {
            if !skipping && marker_name(line) == Some(name) {
                skipping = true;
                dropped += 1;
            }
            if skipping {
                skipping = !is_blank(line);
            } else {
                kept.push_str(line);
            }
        }
        if dropped > 0 {
            *self = Self::parse(&kept);
        }
        dropped
    }

    fn last_line_mut(&mut self) -> Option<&mut String> {
        match self.segments.last_mut()? {
            Segment::Line(line) => Some(line),
            Segment::Device(block) => {
                if !block.closed() {
                    tracing::debug!(device = %block.name, "device block at end of file has no trailing blank line");
                }
                block.lines.last_mut()
            }
        }
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            f.write_str(line)?;
        }
        Ok(())
    }
}
