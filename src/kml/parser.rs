//! Streaming KML boundary parser.
//!
//! Walks the document as a flat stream of pull events and tracks just enough
//! context (current placemark, polygon ring kind, extended-data key) to emit
//! zones as their rings close. The document is never materialized as a tree.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::coordinates::parse_coordinate_list;
use crate::error::ParseError;
use crate::models::{Coordinate, Zone, DESCRIPTION_KEY};

/// Default number of emitted zones between progress notifications
pub const DEFAULT_PROGRESS_EVERY: usize = 50;

/// Parser tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Fire a progress notification every N emitted zones
    pub progress_every: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            progress_every: DEFAULT_PROGRESS_EVERY,
        }
    }
}

/// Approximate load progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParseProgress {
    /// Bytes consumed relative to the expected total, 0.0..=1.0. Never decreases.
    pub fraction: f64,
    pub zones_found: usize,
}

/// Elements the parser reacts to, matched by local name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Placemark,
    Name,
    Description,
    Polygon,
    OuterBoundary,
    InnerBoundary,
    LinearRing,
    Coordinates,
    ExtendedData,
    Data,
    SimpleData,
    Value,
    Other,
}

impl Element {
    fn from_local_name(name: &[u8]) -> Self {
        match name {
            b"Placemark" => Element::Placemark,
            b"name" => Element::Name,
            b"description" => Element::Description,
            b"Polygon" => Element::Polygon,
            b"outerBoundaryIs" => Element::OuterBoundary,
            b"innerBoundaryIs" => Element::InnerBoundary,
            b"LinearRing" => Element::LinearRing,
            b"coordinates" => Element::Coordinates,
            b"ExtendedData" => Element::ExtendedData,
            b"Data" => Element::Data,
            b"SimpleData" => Element::SimpleData,
            b"value" => Element::Value,
            _ => Element::Other,
        }
    }

    /// Entries of an attribute block carry their key in a `name` attribute
    fn carries_key(self) -> bool {
        matches!(self, Element::Data | Element::SimpleData)
    }
}

/// Where the parser sits relative to polygon geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum BoundaryContext {
    #[default]
    None,
    /// Inside a `Polygon` but not inside a boundary wrapper
    BarePolygon,
    Outer,
    Inner,
}

/// Which accumulator the current text belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Name,
    Description,
    Value,
    Coordinates,
}

#[derive(Debug, Clone, Copy)]
enum RingKind {
    Outer,
    Inner,
    Bare,
}

/// Accumulators and context flags threaded through every event
#[derive(Debug, Default)]
struct ParserState {
    depth: usize,
    in_placemark: bool,
    boundary: BoundaryContext,
    in_linear_ring: bool,
    in_extended_data: bool,
    pending_key: Option<String>,
    capture: Option<Capture>,
    text: String,
    name: String,
    attributes: BTreeMap<String, String>,
    ring: Vec<Coordinate>,
    emitted: usize,
}

impl ParserState {
    fn open(&mut self, element: Element, key: Option<String>) {
        self.depth += 1;

        match element {
            Element::Placemark => {
                self.in_placemark = true;
                self.reset_zone();
            }
            Element::Name if self.captures_zone_field() => self.begin_capture(Capture::Name),
            Element::Description if self.captures_zone_field() => {
                self.begin_capture(Capture::Description)
            }
            Element::Polygon => self.boundary = BoundaryContext::BarePolygon,
            Element::OuterBoundary if self.boundary != BoundaryContext::None => {
                self.boundary = BoundaryContext::Outer
            }
            Element::InnerBoundary if self.boundary != BoundaryContext::None => {
                self.boundary = BoundaryContext::Inner
            }
            Element::LinearRing => self.in_linear_ring = true,
            Element::Coordinates
                if self.boundary != BoundaryContext::None && self.in_linear_ring =>
            {
                self.ring.clear();
                self.begin_capture(Capture::Coordinates);
            }
            Element::ExtendedData => self.in_extended_data = true,
            Element::Data if self.in_extended_data => self.pending_key = key,
            Element::SimpleData if self.in_extended_data => {
                if key.is_some() {
                    self.pending_key = key;
                    self.begin_capture(Capture::Value);
                }
            }
            Element::Value if self.in_extended_data && self.pending_key.is_some() => {
                self.begin_capture(Capture::Value)
            }
            _ => {}
        }
    }

    fn close(&mut self, element: Element) -> Option<Zone> {
        self.depth -= 1;

        match element {
            Element::Name if self.capture == Some(Capture::Name) => {
                self.name = self.finish_capture();
            }
            Element::Description if self.capture == Some(Capture::Description) => {
                let text = self.finish_capture();
                if !text.is_empty() {
                    self.attributes.insert(DESCRIPTION_KEY.to_string(), text);
                }
            }
            Element::Value | Element::SimpleData if self.capture == Some(Capture::Value) => {
                let value = self.finish_capture();
                if let Some(key) = self.pending_key.take() {
                    self.attributes.insert(key, value);
                }
            }
            Element::Data => self.pending_key = None,
            Element::ExtendedData => {
                self.in_extended_data = false;
                self.pending_key = None;
            }
            Element::Coordinates if self.capture == Some(Capture::Coordinates) => {
                let text = self.finish_capture();
                self.ring = parse_coordinate_list(&text);
                // Rings wrapped in outer/inner boundaries are emitted when the wrapper closes
                if self.boundary == BoundaryContext::BarePolygon {
                    return self.emit(RingKind::Bare);
                }
            }
            Element::LinearRing => self.in_linear_ring = false,
            Element::OuterBoundary if self.boundary == BoundaryContext::Outer => {
                self.boundary = BoundaryContext::BarePolygon;
                return self.emit(RingKind::Outer);
            }
            Element::InnerBoundary if self.boundary == BoundaryContext::Inner => {
                self.boundary = BoundaryContext::BarePolygon;
                return self.emit(RingKind::Inner);
            }
            Element::Polygon => {
                self.boundary = BoundaryContext::None;
                self.ring.clear();
            }
            Element::Placemark => {
                self.in_placemark = false;
                self.reset_zone();
            }
            _ => {}
        }

        None
    }

    fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// `name`/`description` belong to the placemark only outside geometry and attribute blocks
    fn captures_zone_field(&self) -> bool {
        self.in_placemark
            && self.boundary == BoundaryContext::None
            && !self.in_extended_data
            && self.capture.is_none()
    }

    fn begin_capture(&mut self, capture: Capture) {
        if self.capture.is_none() {
            self.capture = Some(capture);
            self.text.clear();
        }
    }

    fn finish_capture(&mut self) -> String {
        self.capture = None;
        let text = mem::take(&mut self.text);
        text.trim().to_string()
    }

    fn reset_zone(&mut self) {
        self.name.clear();
        self.attributes.clear();
        self.pending_key = None;
    }

    fn emit(&mut self, kind: RingKind) -> Option<Zone> {
        let ring = mem::take(&mut self.ring);
        if ring.is_empty() {
            return None;
        }

        let ordinal = self.emitted + 1;
        let name = match (kind, self.name.is_empty()) {
            (RingKind::Outer, true) => format!("Outer Boundary {}", ordinal),
            (RingKind::Inner, true) => format!("Inner Boundary {}", ordinal),
            (RingKind::Bare, true) => format!("Polygon {}", ordinal),
            (RingKind::Inner, false) => format!("{} - Inner", self.name),
            (RingKind::Outer | RingKind::Bare, false) => self.name.clone(),
        };

        self.emitted += 1;
        trace!("Emitting zone '{}' with {} vertices", name, ring.len());
        Some(Zone::new(name, self.attributes.clone(), ring))
    }
}

/// Incremental zone reader over a KML byte stream.
///
/// Yields each zone as soon as its ring closes. After the first error the
/// stream is exhausted.
pub struct ZoneStream<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: ParserState,
    expected_len: Option<u64>,
    fraction: f64,
    finished: bool,
}

impl<R: BufRead> ZoneStream<R> {
    /// `expected_len` is the total document size in bytes, if known, used
    /// only for the progress estimate.
    pub fn new(source: R, expected_len: Option<u64>) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            state: ParserState::default(),
            expected_len,
            fraction: 0.0,
            finished: false,
        }
    }

    pub fn zones_emitted(&self) -> usize {
        self.state.emitted
    }

    /// Current progress estimate
    pub fn progress(&mut self) -> ParseProgress {
        if let Some(total) = self.expected_len.filter(|total| *total > 0) {
            let consumed = self.reader.buffer_position() as f64;
            let estimate = (consumed / total as f64).clamp(0.0, 1.0);
            self.fraction = self.fraction.max(estimate);
        }

        ParseProgress {
            fraction: self.fraction,
            zones_found: self.state.emitted,
        }
    }

    fn next_zone(&mut self) -> Result<Option<Zone>, ParseError> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    return Err(ParseError::from_xml(
                        self.reader.error_position() as u64,
                        err,
                    ))
                }
            };
            let position = self.reader.buffer_position() as u64;

            match event {
                Event::Start(start) => {
                    let (element, key) = classify(&start, position)?;
                    self.state.open(element, key);
                }
                Event::Empty(start) => {
                    let (element, key) = classify(&start, position)?;
                    self.state.open(element, key);
                    if let Some(zone) = self.state.close(element) {
                        return Ok(Some(zone));
                    }
                }
                Event::End(end) => {
                    if self.state.depth == 0 {
                        return Err(ParseError::malformed(position, "unmatched closing tag"));
                    }
                    let element = Element::from_local_name(end.local_name().as_ref());
                    if let Some(zone) = self.state.close(element) {
                        return Ok(Some(zone));
                    }
                }
                Event::Text(text) => {
                    // Decoded even when not captured so bad encodings fail the document
                    let text = text
                        .unescape()
                        .map_err(|e| ParseError::malformed(position, e.to_string()))?;
                    if self.state.is_capturing() {
                        self.state.push_text(&text);
                    }
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|e| ParseError::malformed(position, e.to_string()))?;
                    if self.state.is_capturing() {
                        self.state.push_text(text);
                    }
                }
                Event::Eof => {
                    if self.state.depth != 0 {
                        return Err(ParseError::malformed(
                            position,
                            format!(
                                "unexpected end of document, {} element(s) left open",
                                self.state.depth
                            ),
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for ZoneStream<R> {
    type Item = Result<Zone, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_zone() {
            Ok(Some(zone)) => Some(Ok(zone)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

fn classify(start: &BytesStart<'_>, position: u64) -> Result<(Element, Option<String>), ParseError> {
    std::str::from_utf8(start.name().as_ref())
        .map_err(|e| ParseError::malformed(position, e.to_string()))?;
    let element = Element::from_local_name(start.local_name().as_ref());

    let mut key = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::malformed(position, e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::malformed(position, e.to_string()))?;
        if element.carries_key() && key.is_none() && attr.key.local_name().as_ref() == b"name" {
            key = Some(value.into_owned());
        }
    }

    Ok((element, key))
}

/// Parse a whole document into zones.
///
/// All-or-nothing: on any document-level failure the zones parsed so far are
/// discarded. `on_progress` fires every `options.progress_every` zones.
pub fn parse_document<R, F>(
    source: R,
    expected_len: Option<u64>,
    options: &ParserOptions,
    mut on_progress: F,
) -> Result<Vec<Zone>, ParseError>
where
    R: BufRead,
    F: FnMut(ParseProgress),
{
    let every = options.progress_every.max(1);
    let mut stream = ZoneStream::new(source, expected_len);
    let mut zones = Vec::new();

    while let Some(zone) = stream.next() {
        zones.push(zone?);
        if zones.len() % every == 0 {
            let progress = stream.progress();
            debug!(
                "Parsed {} zones ({:.0}%)",
                progress.zones_found,
                progress.fraction * 100.0
            );
            on_progress(progress);
        }
    }

    info!("Parsed {} zones", zones.len());
    Ok(zones)
}

/// Open and parse a document on disk
pub fn parse_path<F>(
    path: &Path,
    options: &ParserOptions,
    on_progress: F,
) -> Result<Vec<Zone>, ParseError>
where
    F: FnMut(ParseProgress),
{
    let file = File::open(path)?;
    let expected_len = file.metadata().ok().map(|m| m.len());
    parse_document(BufReader::new(file), expected_len, options, on_progress)
}
