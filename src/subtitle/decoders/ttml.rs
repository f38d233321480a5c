/*!
 * TTML / DFXP / SMPTE-TT decoder.
 *
 * Supports:
 * - clock times (`HH:MM:SS.fff`, `HH:MM:SS:FF[.sub]`) and offset times (`1.5s`, `40f`, `900t`, ...)
 * - `ttp:frameRate`, `ttp:frameRateMultiplier`, `ttp:subFrameRate` and `ttp:tickRate`
 * - time containment: `begin` on `body`/`div` offsets the times of nested paragraphs
 * - italic, bold and underline from inline `tts:*` attributes, referenced styles and regions
 * - top placement from region `tts:displayAlign="before"` or a `tts:origin` in the upper half
 */

use std::collections::HashMap;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::DecodeError;
use crate::subtitle::decoders::markup::{collapse_whitespace, parse_document, Element, Node};
use crate::subtitle::decoders::{decode_text, Decoder};
use crate::subtitle::model::{Alignment, Cue, CueLine, CueSequence, SpanStyle};
use crate::subtitle::sniffer::SubtitleFormat;
use crate::subtitle::timing;

// @const: Clock time with fraction or frames
static CLOCK_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,}):(\d{2}):(\d{2})(?:\.(\d+)|:(\d{2,})(?:\.(\d+))?)?$").unwrap()
});

// @const: Offset time with metric
static OFFSET_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)?)(h|ms|m|s|f|t)$").unwrap()
});

/// Decoder for TTML family documents
#[derive(Debug, Default, Clone, Copy)]
pub struct TtmlDecoder;

impl Decoder for TtmlDecoder {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ttml
    }

    fn decode(&self, data: &[u8]) -> Result<CueSequence, DecodeError> {
        let text = decode_text(data);
        decode_document(&text).map(CueSequence::from)
    }
}

/// Frame and tick parameters of a document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingParameters {
    /// Effective frames per second (frame rate times multiplier)
    pub frame_rate: f64,
    pub sub_frame_rate: f64,
    pub tick_rate: f64,
}

impl Default for TimingParameters {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            sub_frame_rate: 1.0,
            tick_rate: 1.0,
        }
    }
}

impl TimingParameters {
    fn from_root(root: &Element) -> Result<Self, DecodeError> {
        let mut params = Self::default();

        let base_rate = match root.attr("frameRate") {
            Some(value) => parse_positive(value, "frameRate")?,
            None => 30.0,
        };
        let multiplier = match root.attr("frameRateMultiplier") {
            Some(value) => {
                let mut parts = value.split_whitespace();
                let numerator = parts.next().map(|p| parse_positive(p, "frameRateMultiplier"));
                let denominator = parts.next().map(|p| parse_positive(p, "frameRateMultiplier"));
                match (numerator, denominator) {
                    (Some(n), Some(d)) => n? / d?,
                    _ => {
                        return Err(DecodeError::InvalidAttribute {
                            name: "frameRateMultiplier".to_string(),
                            value: value.to_string(),
                        })
                    }
                }
            }
            None => 1.0,
        };
        params.frame_rate = base_rate * multiplier;

        if let Some(value) = root.attr("subFrameRate") {
            params.sub_frame_rate = parse_positive(value, "subFrameRate")?;
        }
        params.tick_rate = match root.attr("tickRate") {
            Some(value) => parse_positive(value, "tickRate")?,
            None if root.attr("frameRate").is_some() => base_rate * params.sub_frame_rate,
            None => 1.0,
        };

        Ok(params)
    }
}

fn parse_positive(value: &str, name: &str) -> Result<f64, DecodeError> {
    match value.trim().parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(DecodeError::InvalidAttribute {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a TTML time expression to milliseconds
pub fn parse_time_expression(value: &str, params: &TimingParameters) -> Result<u64, DecodeError> {
    let value = value.trim();
    let invalid = || DecodeError::invalid_timestamp(value);

    if let Some(caps) = CLOCK_TIME_REGEX.captures(value) {
        let hours: f64 = caps[1].parse().map_err(|_| invalid())?;
        let minutes: f64 = caps[2].parse().map_err(|_| invalid())?;
        let seconds: f64 = caps[3].parse().map_err(|_| invalid())?;
        if minutes >= 60.0 || seconds >= 60.0 {
            return Err(invalid());
        }
        let mut total = hours * 3600.0 + minutes * 60.0 + seconds;

        if let Some(fraction) = caps.get(4) {
            total += format!("0.{}", fraction.as_str()).parse::<f64>().map_err(|_| invalid())?;
        } else if let Some(frames) = caps.get(5) {
            let frames: f64 = frames.as_str().parse().map_err(|_| invalid())?;
            let sub_frames: f64 = match caps.get(6) {
                Some(sub) => sub.as_str().parse().map_err(|_| invalid())?,
                None => 0.0,
            };
            total += (frames + sub_frames / params.sub_frame_rate) / params.frame_rate;
        }
        return timing::seconds_to_ms(total).ok_or_else(invalid);
    }

    if let Some(caps) = OFFSET_TIME_REGEX.captures(value) {
        let count: f64 = caps[1].parse().map_err(|_| invalid())?;
        let seconds = match &caps[2] {
            "h" => count * 3600.0,
            "m" => count * 60.0,
            "s" => count,
            "ms" => count / 1000.0,
            "f" => count / params.frame_rate,
            "t" => count / params.tick_rate,
            _ => return Err(invalid()),
        };
        return timing::seconds_to_ms(seconds).ok_or_else(invalid);
    }

    Err(invalid())
}

// Style properties that can be inherited or referenced
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StyleProps {
    italic: Option<bool>,
    bold: Option<bool>,
    underline: Option<bool>,
    top: Option<bool>,
}

impl StyleProps {
    fn from_element(element: &Element) -> Self {
        let mut props = Self::default();
        if let Some(style) = element.attr("fontStyle") {
            props.italic = Some(style == "italic" || style == "oblique");
        }
        if let Some(weight) = element.attr("fontWeight") {
            props.bold = Some(weight == "bold");
        }
        if let Some(decoration) = element.attr("textDecoration") {
            if decoration.contains("noUnderline") {
                props.underline = Some(false);
            } else if decoration.contains("underline") {
                props.underline = Some(true);
            }
        }
        if let Some(align) = element.attr("displayAlign") {
            props.top = Some(align == "before");
        } else if let Some(origin) = element.attr("origin") {
            props.top = origin_is_top(origin);
        }
        props
    }

    // Fill unset properties from `other`
    fn or(self, other: StyleProps) -> Self {
        Self {
            italic: self.italic.or(other.italic),
            bold: self.bold.or(other.bold),
            underline: self.underline.or(other.underline),
            top: self.top.or(other.top),
        }
    }

    fn span_style(&self) -> SpanStyle {
        SpanStyle {
            italic: self.italic.unwrap_or(false),
            bold: self.bold.unwrap_or(false),
            underline: self.underline.unwrap_or(false),
        }
    }
}

// "x% y%" with y in the upper half of the frame
fn origin_is_top(origin: &str) -> Option<bool> {
    let y = origin.split_whitespace().nth(1)?;
    let y = y.strip_suffix('%')?.parse::<f64>().ok()?;
    Some(y < 50.0)
}

// Styles and regions declared in the document head
struct Head {
    styles: HashMap<String, StyleProps>,
    regions: HashMap<String, StyleProps>,
}

impl Head {
    fn from_root(root: &Element) -> Self {
        let mut raw_styles: HashMap<String, &Element> = HashMap::new();
        let mut style_elements = Vec::new();
        root.descendants("style", &mut style_elements);
        for style in style_elements {
            if let Some(id) = style.attr("id") {
                raw_styles.insert(id.to_string(), style);
            }
        }

        let mut styles = HashMap::new();
        for id in raw_styles.keys() {
            styles.insert(id.clone(), resolve_style(id, &raw_styles, 0));
        }

        let mut regions = HashMap::new();
        let mut region_elements = Vec::new();
        root.descendants("region", &mut region_elements);
        for region in region_elements {
            let Some(id) = region.attr("id") else { continue };
            let mut props = StyleProps::from_element(region);
            // Nested <style> children and style references also configure the region
            for nested in region.elements().filter(|e| e.is("style")) {
                props = props.or(StyleProps::from_element(nested));
            }
            if let Some(refs) = region.attr("style") {
                for reference in refs.split_whitespace() {
                    if let Some(referenced) = styles.get(reference) {
                        props = props.or(*referenced);
                    }
                }
            }
            regions.insert(id.to_string(), props);
        }

        Self { styles, regions }
    }

    fn referenced(&self, element: &Element) -> StyleProps {
        let mut props = StyleProps::default();
        if let Some(refs) = element.attr("style") {
            for reference in refs.split_whitespace() {
                if let Some(style) = self.styles.get(reference) {
                    props = props.or(*style);
                }
            }
        }
        props
    }
}

fn resolve_style(id: &str, raw: &HashMap<String, &Element>, depth: usize) -> StyleProps {
    let Some(element) = raw.get(id) else {
        return StyleProps::default();
    };
    let mut props = StyleProps::from_element(element);
    // Guard against reference cycles
    if depth < 8 {
        if let Some(refs) = element.attr("style") {
            for reference in refs.split_whitespace() {
                props = props.or(resolve_style(reference, raw, depth + 1));
            }
        }
    }
    props
}

// Inherited state while walking the body
#[derive(Clone)]
struct Context<'d> {
    offset_ms: u64,
    end_ms: Option<u64>,
    style: StyleProps,
    region: Option<&'d str>,
    language: Option<&'d str>,
}

struct Walker {
    params: TimingParameters,
    head: Head,
    cues: Vec<Cue>,
}

impl Walker {
    fn timed_interval(&self, element: &Element, ctx: &Context<'_>) -> Result<(u64, Option<u64>), DecodeError> {
        let after = |base: u64, value: &str| -> Result<u64, DecodeError> {
            base.checked_add(parse_time_expression(value, &self.params)?)
                .ok_or_else(|| DecodeError::invalid_timestamp(value))
        };
        let begin = match element.attr("begin") {
            Some(value) => after(ctx.offset_ms, value)?,
            None => ctx.offset_ms,
        };
        let end = match (element.attr("end"), element.attr("dur")) {
            (Some(value), _) => Some(after(ctx.offset_ms, value)?),
            (None, Some(value)) => Some(after(begin, value)?),
            (None, None) => ctx.end_ms,
        };
        Ok((begin, end))
    }

    fn child_context<'d>(&self, element: &'d Element, ctx: &Context<'d>) -> Result<Context<'d>, DecodeError> {
        let (begin, end) = self.timed_interval(element, ctx)?;
        let inline = StyleProps::from_element(element);
        Ok(Context {
            offset_ms: begin,
            end_ms: end,
            style: inline.or(self.head.referenced(element)).or(ctx.style),
            region: element.attr("region").or(ctx.region),
            language: element.attr("lang").or(ctx.language),
        })
    }

    fn walk<'d>(&mut self, element: &'d Element, ctx: &Context<'d>) -> Result<(), DecodeError> {
        for child in element.elements() {
            match child.local_name() {
                "div" => {
                    let child_ctx = self.child_context(child, ctx)?;
                    self.walk(child, &child_ctx)?;
                }
                "p" => self.paragraph(child, ctx)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn paragraph<'d>(&mut self, p: &'d Element, ctx: &Context<'d>) -> Result<(), DecodeError> {
        let p_ctx = self.child_context(p, ctx)?;
        let Some(end) = p_ctx.end_ms else {
            warn!("Skipping paragraph without end time at {}ms", p_ctx.offset_ms);
            return Ok(());
        };

        let region_props = p_ctx
            .region
            .and_then(|id| self.head.regions.get(id))
            .copied()
            .unwrap_or_default();
        let style = p_ctx.style.or(region_props);

        let mut lines = vec![CueLine::default()];
        collect_lines(p, style, &self.head, &mut lines);
        for line in lines.iter_mut() {
            line.tidy();
        }
        lines.retain(|line| !line.is_blank());

        if lines.is_empty() {
            debug!("Skipping empty paragraph at {}ms", p_ctx.offset_ms);
            return Ok(());
        }

        let alignment = if style.top.unwrap_or(false) { Alignment::Top } else { Alignment::Bottom };
        let mut cue = Cue::new(p_ctx.offset_ms, end, lines).with_alignment(alignment);
        cue.language = p_ctx.language.map(str::to_string);
        self.cues.push(cue);
        Ok(())
    }
}

fn collect_lines(element: &Element, style: StyleProps, head: &Head, lines: &mut Vec<CueLine>) {
    for child in &element.children {
        match child {
            Node::Text(text) => {
                let collapsed = collapse_whitespace(text);
                if let Some(line) = lines.last_mut() {
                    line.push_text(&collapsed, style.span_style());
                }
            }
            Node::Element(e) if e.is("br") => lines.push(CueLine::default()),
            Node::Element(e) if e.is("span") => {
                let span_style = StyleProps::from_element(e).or(head.referenced(e)).or(style);
                collect_lines(e, span_style, head, lines);
            }
            Node::Element(_) => {}
        }
    }
}

/// Decode one TTML document held in a string
pub fn decode_document(text: &str) -> Result<Vec<Cue>, DecodeError> {
    let root = parse_document(text)?;
    if !root.is("tt") {
        return Err(DecodeError::MissingRoot("tt"));
    }

    let params = TimingParameters::from_root(&root)?;
    let head = Head::from_root(&root);
    let Some(body) = root.child("body") else {
        debug!("TTML document without body");
        return Ok(Vec::new());
    };

    let mut walker = Walker {
        params,
        head,
        cues: Vec::new(),
    };
    let root_ctx = Context {
        offset_ms: 0,
        end_ms: None,
        style: StyleProps::default(),
        region: root.attr("region"),
        language: root.attr("lang"),
    };
    let body_ctx = walker.child_context(body, &root_ctx)?;
    walker.walk(body, &body_ctx)?;

    Ok(walker.cues)
}
