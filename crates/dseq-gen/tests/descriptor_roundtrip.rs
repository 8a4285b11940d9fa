use dseq_core::rng::RngHandle;
use dseq_core::{ParameterFlags, PlacementRecord, SoilVariant, Vec3};
use dseq_gen::{SequenceAssembler, SequenceDescriptor};
use tempfile::tempdir;

fn sample_descriptor() -> SequenceDescriptor {
    let records: Vec<PlacementRecord> = (0..3)
        .map(|index| PlacementRecord {
            index,
            position: Vec3::default(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            rotation: Vec3::default(),
        })
        .collect();
    let variants: Vec<SoilVariant> = ["dry", "wet"]
        .iter()
        .map(|name| SoilVariant {
            name: name.to_string(),
            directory_path: name.to_string().into(),
            band_file_count: 2,
        })
        .collect();
    let flags = ParameterFlags {
        scale: true,
        soil_temperature: true,
        tree_temperature: true,
        chlorophyll: true,
        water_thickness: true,
    };
    let mut rng = RngHandle::from_seed(77);
    SequenceAssembler::new(7, flags)
        .unwrap()
        .assemble(&records, Some(variants.as_slice()), &mut rng)
        .unwrap()
}

#[test]
fn reparsed_descriptor_keeps_shape() {
    let descriptor = sample_descriptor();
    let xml = descriptor.to_xml().unwrap();
    let parsed = SequenceDescriptor::from_xml(&xml).unwrap();

    assert_eq!(parsed.shape(), descriptor.shape());
    assert_eq!(parsed, descriptor);
}

#[test]
fn document_has_fixed_top_level_shape() {
    let xml = sample_descriptor().to_xml().unwrap();
    let root = xml.find("<DartFile version=\"1.0\">").unwrap();
    let descriptor = xml.find("<DartSequencerDescriptor sequenceName=").unwrap();
    let entries = xml.find("<DartSequencerDescriptorEntries>").unwrap();
    let preferences = xml.find("<DartSequencerPreferences").unwrap();
    let lut = xml.find("<DartLutPreferences").unwrap();
    assert!(root < descriptor && descriptor < entries && entries < preferences && preferences < lut);
    assert_eq!(xml.matches("type=\"enumerate\"").count(), 3 * 7 + 1 + 2);
}

#[test]
fn rendering_is_deterministic() {
    let descriptor = sample_descriptor();
    assert_eq!(descriptor.to_xml().unwrap(), descriptor.to_xml().unwrap());
}

#[test]
fn file_roundtrip_preserves_preferences() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sequence.xml");
    let descriptor = sample_descriptor();
    descriptor.write_to(&path).unwrap();
    let restored = SequenceDescriptor::read_from(&path).unwrap();
    assert_eq!(restored.preferences, descriptor.preferences);
    assert_eq!(restored.lut_preferences.get("phiMax").map(String::as_str), Some(""));
}

#[test]
fn entry_outside_group_is_rejected() {
    let xml = r#"<DartFile><DartSequencerDescriptor sequenceName="s"><DartSequencerDescriptorEntries>
<DartSequencerDescriptorEntry args="1;2" propertyName="a.b" type="enumerate"/>
</DartSequencerDescriptorEntries></DartSequencerDescriptor></DartFile>"#;
    let err = SequenceDescriptor::from_xml(xml).unwrap_err();
    assert!(err.info().is(dseq_core::codes::XML_PARSE));
}
