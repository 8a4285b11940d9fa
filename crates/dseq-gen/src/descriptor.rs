//! Sequence descriptor document model and its markup encoding.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::encoder::ParameterSeries;

pub const DEFAULT_SEQUENCE_NAME: &str = "sequence;;sequence";
pub const ENTRY_TYPE: &str = "enumerate";
pub const PRIMARY_GROUP: &str = "group1";
pub const SOIL_GROUP: &str = "group2";

const ROOT: &str = "DartFile";
const DESCRIPTOR: &str = "DartSequencerDescriptor";
const ENTRIES: &str = "DartSequencerDescriptorEntries";
const GROUP: &str = "DartSequencerDescriptorGroup";
const ENTRY: &str = "DartSequencerDescriptorEntry";
const PREFERENCES: &str = "DartSequencerPreferences";
const LUT_PREFERENCES: &str = "DartLutPreferences";

/// Independent enumeration axis of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGroup {
    pub name: String,
    pub series: Vec<ParameterSeries>,
}

impl SequenceGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            series: Vec::new(),
        }
    }
}

/// Complete sequence descriptor: groups plus the two preference blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescriptor {
    pub sequence_name: String,
    pub groups: Vec<SequenceGroup>,
    pub preferences: BTreeMap<String, String>,
    pub lut_preferences: BTreeMap<String, String>,
}

/// Group name and series lengths, used for inspection and round-trip checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupShape {
    pub name: String,
    pub series_lengths: Vec<usize>,
}

impl SequenceDescriptor {
    pub fn group(&self, name: &str) -> Option<&SequenceGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn shape(&self) -> Vec<GroupShape> {
        self.groups
            .iter()
            .map(|group| GroupShape {
                name: group.name.clone(),
                series_lengths: group.series.iter().map(ParameterSeries::len).collect(),
            })
            .collect()
    }

    pub fn series_count(&self) -> usize {
        self.groups.iter().map(|group| group.series.len()).sum()
    }

    /// Renders the descriptor with four-space indentation and sorted
    /// preference attributes.
    pub fn to_xml(&self) -> Result<String, DseqError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new(ROOT);
        root.push_attribute(("version", "1.0"));
        write(&mut writer, Event::Start(root))?;

        let mut descriptor = BytesStart::new(DESCRIPTOR);
        descriptor.push_attribute(("sequenceName", self.sequence_name.as_str()));
        write(&mut writer, Event::Start(descriptor))?;

        write(&mut writer, Event::Start(BytesStart::new(ENTRIES)))?;
        for group in &self.groups {
            let mut start = BytesStart::new(GROUP);
            start.push_attribute(("currentDisplayedPage", "1"));
            start.push_attribute(("groupName", group.name.as_str()));
            write(&mut writer, Event::Start(start))?;
            for series in &group.series {
                let args = series.args();
                let mut entry = BytesStart::new(ENTRY);
                entry.push_attribute(("args", args.as_str()));
                entry.push_attribute(("propertyName", series.property_path.as_str()));
                entry.push_attribute(("type", ENTRY_TYPE));
                write(&mut writer, Event::Empty(entry))?;
            }
            write(&mut writer, Event::End(BytesEnd::new(GROUP)))?;
        }
        write(&mut writer, Event::End(BytesEnd::new(ENTRIES)))?;

        write(&mut writer, Event::Empty(attribute_bag(PREFERENCES, &self.preferences)))?;
        write(&mut writer, Event::Empty(attribute_bag(LUT_PREFERENCES, &self.lut_preferences)))?;

        write(&mut writer, Event::End(BytesEnd::new(DESCRIPTOR)))?;
        write(&mut writer, Event::End(BytesEnd::new(ROOT)))?;

        let mut text = String::from_utf8(writer.into_inner()).map_err(|err| {
            DseqError::Descriptor(ErrorInfo::new(codes::XML_WRITE, err.to_string()))
        })?;
        text.push('\n');
        Ok(text)
    }

    /// Parses a descriptor previously produced by [`SequenceDescriptor::to_xml`]
    /// or by the engine's own sequencer editor.
    pub fn from_xml(xml: &str) -> Result<Self, DseqError> {
        let mut reader = Reader::from_str(xml);
        let mut descriptor = SequenceDescriptor {
            sequence_name: String::new(),
            groups: Vec::new(),
            preferences: BTreeMap::new(),
            lut_preferences: BTreeMap::new(),
        };
        let mut current: Option<SequenceGroup> = None;
        loop {
            let event = reader.read_event().map_err(|err| {
                DseqError::Descriptor(
                    parse_error(err)
                        .with_context("position", reader.buffer_position().to_string()),
                )
            })?;
            match event {
                Event::Start(element) | Event::Empty(element)
                    if element.name().as_ref() == DESCRIPTOR.as_bytes() =>
                {
                    let attrs = attributes(&element)?;
                    descriptor.sequence_name = attrs
                        .get("sequenceName")
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_SEQUENCE_NAME.to_string());
                }
                Event::Start(element) if element.name().as_ref() == GROUP.as_bytes() => {
                    if let Some(open) = current.take() {
                        descriptor.groups.push(open);
                    }
                    current = Some(SequenceGroup::new(group_name(&element)?));
                }
                Event::Empty(element) if element.name().as_ref() == GROUP.as_bytes() => {
                    descriptor.groups.push(SequenceGroup::new(group_name(&element)?));
                }
                Event::End(element) if element.name().as_ref() == GROUP.as_bytes() => {
                    if let Some(open) = current.take() {
                        descriptor.groups.push(open);
                    }
                }
                Event::Start(element) | Event::Empty(element)
                    if element.name().as_ref() == ENTRY.as_bytes() =>
                {
                    let attrs = attributes(&element)?;
                    let Some(group) = current.as_mut() else {
                        return Err(DseqError::Descriptor(ErrorInfo::new(
                            codes::XML_PARSE,
                            "sequence entry outside of a group",
                        )));
                    };
                    let path = attrs.get("propertyName").cloned().unwrap_or_default();
                    let args = attrs.get("args").map(String::as_str).unwrap_or("");
                    group.series.push(ParameterSeries::from_args(path, args));
                }
                Event::Start(element) | Event::Empty(element)
                    if element.name().as_ref() == PREFERENCES.as_bytes() =>
                {
                    descriptor.preferences = attributes(&element)?;
                }
                Event::Start(element) | Event::Empty(element)
                    if element.name().as_ref() == LUT_PREFERENCES.as_bytes() =>
                {
                    descriptor.lut_preferences = attributes(&element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if let Some(open) = current.take() {
            descriptor.groups.push(open);
        }
        Ok(descriptor)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), DseqError> {
        let xml = self.to_xml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| fs_error(path, err))?;
        }
        fs::write(path, xml).map_err(|err| fs_error(path, err))
    }

    pub fn read_from(path: &Path) -> Result<Self, DseqError> {
        if !path.is_file() {
            return Err(DseqError::source_not_found("sequence descriptor", path));
        }
        let xml = fs::read_to_string(path).map_err(|err| fs_error(path, err))?;
        Self::from_xml(&xml).map_err(|err| match err {
            DseqError::Descriptor(info) => {
                DseqError::Descriptor(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }
}

/// Static sequencer preferences passed through to the engine.
pub fn default_preferences() -> BTreeMap<String, String> {
    [
        ("atmosphereMaketLaunched", "true"),
        ("dartLaunched", "true"),
        ("deleteAll", "false"),
        ("deleteAtmosphere", "false"),
        ("deleteAtmosphereMaket", "false"),
        ("deleteBandFolder", "false"),
        ("deleteDartLut", "false"),
        ("deleteDartSequenceur", "false"),
        ("deleteDartTxt", "false"),
        ("deleteDirection", "false"),
        ("deleteInputs", "false"),
        ("deleteLibPhase", "false"),
        ("deleteMaket", "false"),
        ("deleteMaketTreeResults", "false"),
        ("deletePlyFolder", "false"),
        ("deleteScnFiles", "false"),
        ("deleteTreePosition", "false"),
        ("deleteTriangles", "false"),
        ("demGeneratorLaunched", "false"),
        ("directionLaunched", "false"),
        ("displayEnabled", "true"),
        ("hapkeLaunched", "false"),
        ("individualDisplayEnabled", "false"),
        ("maketLaunched", "true"),
        ("numberOfEnumerateValuesDisplayed", "1000"),
        ("numberParallelThreads", "4"),
        ("phaseLaunched", "true"),
        ("prospectLaunched", "true"),
        ("triangleFileProcessorLaunched", "true"),
        ("useBroadBand", "true"),
        ("useSceneSpectra", "true"),
        ("vegetationLaunched", "true"),
        ("zippedResults", "false"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// Static LUT preferences passed through to the engine.
pub fn default_lut_preferences() -> BTreeMap<String, String> {
    [
        ("addedDirection", "false"),
        ("atmosToa", "false"),
        ("atmosToaOrdre", "false"),
        ("coupl", "true"),
        ("fluorescence", "true"),
        ("generateLUT", "false"),
        ("iterx", "true"),
        ("luminance", "true"),
        ("maketCoverage", "false"),
        ("ordre", "true"),
        ("otherIter", "true"),
        ("phiMax", ""),
        ("phiMin", ""),
        ("productsPerType", "false"),
        ("reflectance", "true"),
        ("sensor", "true"),
        ("storeIndirect", "false"),
        ("thetaMax", ""),
        ("thetaMin", ""),
        ("toa", "true"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

fn attribute_bag<'a>(name: &'a str, attrs: &'a BTreeMap<String, String>) -> BytesStart<'a> {
    let mut element = BytesStart::new(name);
    for (key, value) in attrs {
        element.push_attribute((key.as_str(), value.as_str()));
    }
    element
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DseqError> {
    writer
        .write_event(event)
        .map_err(|err| DseqError::Descriptor(ErrorInfo::new(codes::XML_WRITE, err.to_string())))
}

fn attributes(element: &BytesStart<'_>) -> Result<BTreeMap<String, String>, DseqError> {
    let mut out = BTreeMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|err| DseqError::Descriptor(parse_error(err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| DseqError::Descriptor(parse_error(err)))?
            .into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn group_name(element: &BytesStart<'_>) -> Result<String, DseqError> {
    Ok(attributes(element)?.remove("groupName").unwrap_or_default())
}

fn parse_error(err: impl ToString) -> ErrorInfo {
    ErrorInfo::new(codes::XML_PARSE, "malformed sequence descriptor").with_hint(err.to_string())
}

fn fs_error(path: &Path, err: std::io::Error) -> DseqError {
    DseqError::Filesystem(
        ErrorInfo::new("descriptor-io", "failed to access sequence descriptor")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}
