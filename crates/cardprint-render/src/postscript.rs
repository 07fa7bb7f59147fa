//! PostScript print backend.
//!
//! Each document is built in memory as a PostScript program whose user
//! space is scaled to device units with the origin at the top-left corner,
//! matching the [`PrintSurface`] coordinate system. On `end_document` the
//! program is either piped to `lp` or written into a spool directory.
//!
//! Arial is substituted by Helvetica, its metric equivalent in the
//! standard PostScript font set. Both faces are re-encoded with
//! ISOLatin1Encoding in the document setup so accented Latin-1 text
//! prints as written.

use crate::error::{DeviceFault, DeviceResult};
use crate::surface::{DevicePoint, DeviceRect, FontSpec, FontWeight, PrintSurface, PrintTarget};
use crate::units::Resolution;
use cardprint_core::SurfaceSize;
use cardprint_core::constants::{MM_PER_INCH, POINTS_PER_INCH};
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Ascent of Helvetica as a fraction of the em height. Text origins name
/// the top of the character cell, PostScript `show` starts at the baseline.
const ASCENT_RATIO: f64 = 0.905;

/// Latin-1 copies of the standard faces, defined in every document setup.
const REGULAR_FACE: &str = "Helvetica-Latin1";
const BOLD_FACE: &str = "Helvetica-Bold-Latin1";

/// PostScript defining `new` as `base` with ISOLatin1Encoding.
fn reencode_face(base: &str, new: &str) -> String {
    format!(
        "/{base} findfont dup length dict begin\n\
         {{ 1 index /FID ne {{ def }} {{ pop pop }} ifelse }} forall\n\
         /Encoding ISOLatin1Encoding def\n\
         currentdict end /{new} exch definefont pop\n"
    )
}

/// Where finished documents go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpoolMode {
    /// Pipe to the `lp` command.
    Lp,

    /// Write `<document>-<n>.ps` files into a directory.
    Directory(PathBuf),
}

/// Print target producing PostScript documents.
#[derive(Debug, Clone)]
pub struct PostScriptTarget {
    resolution: Resolution,
    media: SurfaceSize,
    spool: SpoolMode,
}

impl PostScriptTarget {
    /// Create a target rendering at `resolution` onto pages of `media` size.
    pub fn new(resolution: Resolution, media: SurfaceSize, spool: SpoolMode) -> Self {
        Self {
            resolution,
            media,
            spool,
        }
    }
}

impl PrintTarget for PostScriptTarget {
    type Surface = PostScriptSurface;

    fn open(&self, device: Option<&str>) -> DeviceResult<PostScriptSurface> {
        if self.resolution.dpi_x == 0 || self.resolution.dpi_y == 0 {
            return Err(DeviceFault::new("open device", "resolution must be non-zero"));
        }
        if let Some(name) = device {
            if name.trim().is_empty() {
                return Err(DeviceFault::new("open device", "printer name is empty"));
            }
        }
        if let SpoolMode::Directory(dir) = &self.spool {
            fs::create_dir_all(dir).map_err(|e| DeviceFault::io("open device", &e))?;
        }

        debug!(
            "Opened PostScript surface ({}) for {}",
            self.resolution,
            device.unwrap_or("default printer")
        );

        Ok(PostScriptSurface {
            resolution: self.resolution,
            media: self.media,
            spool: self.spool.clone(),
            device: device.map(str::to_string),
            document: None,
            pages: 0,
        })
    }
}

struct Document {
    name: String,
    program: String,
}

/// Surface opened by a [`PostScriptTarget`].
pub struct PostScriptSurface {
    resolution: Resolution,
    media: SurfaceSize,
    spool: SpoolMode,
    device: Option<String>,
    document: Option<Document>,
    pages: u32,
}

impl PostScriptSurface {
    fn program(&mut self) -> &mut String {
        match self.document.as_mut() {
            Some(document) => &mut document.program,
            None => panic!("drawing outside a document"),
        }
    }

    fn media_points(&self) -> (f64, f64) {
        (
            self.media.width_mm / MM_PER_INCH * POINTS_PER_INCH,
            self.media.height_mm / MM_PER_INCH * POINTS_PER_INCH,
        )
    }

    fn submit(&self, document: &Document) -> DeviceResult<()> {
        match &self.spool {
            SpoolMode::Lp => submit_lp(self.device.as_deref(), document),
            SpoolMode::Directory(dir) => {
                let path = next_spool_path(dir, &document.name);
                fs::write(&path, &document.program)
                    .map_err(|e| DeviceFault::io("submit job", &e))?;
                info!("Spooled {} to {}", document.name, path.display());
                Ok(())
            }
        }
    }
}

impl PrintSurface for PostScriptSurface {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn start_document(&mut self, name: &str) -> DeviceResult<()> {
        if self.document.is_some() {
            return Err(DeviceFault::new("start document", "a document is already open"));
        }

        let (width_pt, height_pt) = self.media_points();
        let mut program = String::with_capacity(1024);
        // Writing into a String cannot fail
        let _ = write!(
            program,
            "%!PS-Adobe-3.0\n\
             %%Title: ({title})\n\
             %%Creator: cardprint\n\
             %%BoundingBox: 0 0 {w} {h}\n\
             %%Pages: (atend)\n\
             %%EndComments\n\
             %%BeginSetup\n\
             << /PageSize [{width_pt:.3} {height_pt:.3}] >> setpagedevice\n\
             {regular}{bold}\
             %%EndSetup\n",
            title = escape_text(name),
            w = width_pt.ceil() as i64,
            h = height_pt.ceil() as i64,
            regular = reencode_face("Helvetica", REGULAR_FACE),
            bold = reencode_face("Helvetica-Bold", BOLD_FACE),
        );

        self.document = Some(Document {
            name: name.to_string(),
            program,
        });
        self.pages = 0;
        Ok(())
    }

    fn start_page(&mut self) -> DeviceResult<()> {
        if self.document.is_none() {
            return Err(DeviceFault::new("start page", "no document is open"));
        }
        self.pages += 1;

        let (_, height_pt) = self.media_points();
        let scale_x = POINTS_PER_INCH / f64::from(self.resolution.dpi_x);
        let scale_y = POINTS_PER_INCH / f64::from(self.resolution.dpi_y);
        let page = self.pages;
        let _ = write!(
            self.program(),
            "%%Page: {page} {page}\n\
             gsave\n\
             0 {height_pt:.3} translate\n\
             {scale_x:.6} -{scale_y:.6} scale\n\
             0 setgray 1 setlinewidth\n"
        );
        Ok(())
    }

    fn frame_rect(&mut self, rect: DeviceRect) {
        // Stroke centered half a unit inside so the one-unit border stays
        // within the rectangle
        let _ = writeln!(
            self.program(),
            "{:.1} {:.1} {} {} rectstroke",
            f64::from(rect.left) + 0.5,
            f64::from(rect.top) + 0.5,
            rect.width() - 1,
            rect.height() - 1,
        );
    }

    fn draw_text(&mut self, origin: DevicePoint, font: &FontSpec, text: &str) {
        let face = match font.weight {
            FontWeight::Bold => BOLD_FACE,
            FontWeight::Normal => REGULAR_FACE,
        };
        let baseline = f64::from(origin.y) + f64::from(font.height_px) * ASCENT_RATIO;
        let _ = writeln!(
            self.program(),
            "/{face} findfont {size} scalefont setfont\n\
             {x} {baseline:.2} moveto gsave 1 -1 scale ({text}) show grestore",
            size = font.height_px,
            x = origin.x,
            text = escape_text(text),
        );
    }

    fn end_page(&mut self) {
        if self.document.is_some() {
            self.program().push_str("grestore\nshowpage\n");
        }
    }

    fn end_document(&mut self) -> DeviceResult<()> {
        let mut document = self
            .document
            .take()
            .ok_or_else(|| DeviceFault::new("submit job", "no document is open"))?;
        let _ = write!(document.program, "%%Trailer\n%%Pages: {}\n%%EOF\n", self.pages);
        self.submit(&document)
    }

    fn abort_document(&mut self) {
        if let Some(document) = self.document.take() {
            debug!("Discarded PostScript document {}", document.name);
        }
    }

    fn close(&mut self) {
        self.document = None;
    }
}

fn submit_lp(device: Option<&str>, document: &Document) -> DeviceResult<()> {
    let mut command = Command::new("lp");
    if let Some(device) = device {
        command.arg("-d").arg(device);
    }
    command
        .arg("-t")
        .arg(&document.name)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| DeviceFault::io("submit job", &e))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(document.program.as_bytes())
            .map_err(|e| DeviceFault::io("submit job", &e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| DeviceFault::io("submit job", &e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeviceFault::new(
            "submit job",
            format!("lp exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    info!(
        "Submitted {} to {}: {}",
        document.name,
        device.unwrap_or("default printer"),
        String::from_utf8_lossy(&output.stdout).trim()
    );
    Ok(())
}

/// First `<name>-<n>.ps` in `dir` that does not exist yet.
fn next_spool_path(dir: &Path, name: &str) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    (1u32..)
        .map(|n| dir.join(format!("{stem}-{n:04}.ps")))
        .find(|path| !path.exists())
        .unwrap_or_else(|| dir.join(format!("{stem}.ps")))
}

/// Escape text for a PostScript string literal.
///
/// Characters outside printable ASCII are written as octal escapes when
/// they fit in one byte, which the Latin-1 faces map to the same character,
/// and replaced by `?` otherwise.
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => match u8::try_from(u32::from(c)) {
                Ok(byte) => {
                    let _ = write!(escaped, "\\{byte:03o}");
                }
                Err(_) => escaped.push('?'),
            },
        }
    }
    escaped
}
