use std::io::Write;

use citygml3d::citygml::{
    DocumentLoader, ExtractionContext, LoadStatus, NumericPolicy, XmlTokenizer, load_str,
};
use citygml3d::config::ViewerConfig;

const CITY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<core:CityModel xmlns:core="http://www.opengis.net/citygml/2.0"
    xmlns:bldg="http://www.opengis.net/citygml/building/2.0"
    xmlns:gml="http://www.opengis.net/gml">
  <!-- one building, three surfaces -->
  <core:cityObjectMember>
    <bldg:Building gml:id="B1">
      <bldg:boundedBy>
        <bldg:RoofSurface>
          <bldg:lod2MultiSurface>
            <gml:MultiSurface>
              <gml:surfaceMember>
                <gml:Polygon>
                  <gml:exterior>
                    <gml:LinearRing>
                      <gml:posList srsDimension="3">0 0 12.5 8 0 12.5 8 6 12.5 0 6 12.5 0 0 12.5</gml:posList>
                    </gml:LinearRing>
                  </gml:exterior>
                </gml:Polygon>
              </gml:surfaceMember>
            </gml:MultiSurface>
          </bldg:lod2MultiSurface>
        </bldg:RoofSurface>
      </bldg:boundedBy>
      <bldg:boundedBy>
        <bldg:WallSurface>
          <bldg:lod2MultiSurface>
            <gml:MultiSurface>
              <gml:surfaceMember>
                <gml:Polygon>
                  <gml:exterior>
                    <gml:LinearRing>
                      <gml:pos>0 0 0</gml:pos>
                      <gml:pos>8 0 0</gml:pos>
                      <gml:pos>8 0 10</gml:pos>
                      <gml:pos>0 0 10</gml:pos>
                      <gml:pos>0 0 0</gml:pos>
                    </gml:LinearRing>
                  </gml:exterior>
                </gml:Polygon>
              </gml:surfaceMember>
            </gml:MultiSurface>
          </bldg:lod2MultiSurface>
        </bldg:WallSurface>
      </bldg:boundedBy>
      <bldg:boundedBy>
        <bldg:GroundSurface>
          <bldg:lod2MultiSurface>
            <gml:MultiSurface>
              <gml:surfaceMember>
                <gml:Polygon>
                  <gml:exterior>
                    <gml:LinearRing>
                      <gml:posList>0 0 0 0 6 0 8 6 0 8 0 0 0 0 0</gml:posList>
                    </gml:LinearRing>
                  </gml:exterior>
                  <gml:interior>
                    <gml:LinearRing>
                      <gml:posList>2 2 0 4 2 0 4 4 0 2 4 0 2 2 0</gml:posList>
                    </gml:LinearRing>
                  </gml:interior>
                </gml:Polygon>
              </gml:surfaceMember>
            </gml:MultiSurface>
          </bldg:lod2MultiSurface>
        </bldg:GroundSurface>
      </bldg:boundedBy>
    </bldg:Building>
  </core:cityObjectMember>
</core:CityModel>
"#;

fn with_chunk_size(chunk_size: usize) -> ViewerConfig {
    ViewerConfig {
        chunk_size,
        ..ViewerConfig::default()
    }
}

#[test]
fn test_whole_document() {
    let context = load_str(CITY, &with_chunk_size(CITY.len()));
    assert!(context.is_closed());
    assert!(context.error().is_none());

    let stats = context.stats();
    assert_eq!(stats.polygons, 3);
    assert_eq!(stats.triangles, 2 + 2 + 8);
    assert_eq!(stats.roof_polygons, 1);
    assert_eq!(stats.wall_polygons, 1);
    assert_eq!(stats.floor_polygons, 1);
    assert_eq!(stats.degenerate_polygons, 0);
    assert_eq!(stats.invalid_tokens, 0);

    let bounds = context.bounds();
    assert_eq!(bounds.lower().to_array(), [0.0, 0.0, 0.0]);
    assert_eq!(bounds.upper().to_array(), [8.0, 6.0, 12.5]);
    assert_eq!(bounds.center().to_array(), [4.0, 3.0, 6.25]);

    let roof = &context.meshes()[0];
    assert_eq!(roof.color[1], 0.0);
    assert_eq!(roof.color[2], 0.0);
    assert!(roof.color[0] > 0.3 && roof.color[0] < 0.9);
    assert!(roof.triangles.iter().all(|p| p.z == 12.5));

    // the hole stays open
    let ground = &context.meshes()[2];
    assert!(ground.triangles.iter().all(|p| p.z == 0.0));
    for tri in ground.triangles.chunks_exact(3) {
        let centroid = (tri[0] + tri[1] + tri[2]) / 3.0;
        let inside_hole =
            centroid.x > 2.0 && centroid.x < 4.0 && centroid.y > 2.0 && centroid.y < 4.0;
        assert!(!inside_hole, "triangle {tri:?} covers the hole");
    }
}

#[test]
fn test_chunk_size_does_not_change_the_mesh() {
    let reference = load_str(CITY, &with_chunk_size(CITY.len()));

    for chunk_size in [1, 2, 3, 5, 7, 13, 64, 511, 4096] {
        let context = load_str(CITY, &with_chunk_size(chunk_size));
        assert!(context.error().is_none(), "chunk size {chunk_size}");
        assert_eq!(context.meshes(), reference.meshes(), "chunk size {chunk_size}");
        assert_eq!(context.bounds(), reference.bounds(), "chunk size {chunk_size}");
        assert_eq!(context.stats(), reference.stats(), "chunk size {chunk_size}");
    }
}

#[test]
fn test_number_split_across_chunks() {
    let split = CITY.find("12.5").map(|i| i + 2).unwrap_or(0);
    assert!(split > 0);

    let mut context = ExtractionContext::new(NumericPolicy::default());
    let mut tokenizer = XmlTokenizer::new();
    tokenizer.write(&CITY.as_bytes()[..split], &mut context).unwrap();
    tokenizer.write(&CITY.as_bytes()[split..], &mut context).unwrap();
    tokenizer.close(&mut context).unwrap();

    let reference = load_str(CITY, &with_chunk_size(CITY.len()));
    assert_eq!(context.meshes(), reference.meshes());
    assert_eq!(context.bounds().upper().z, 12.5);
}

#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join(format!("citygml3d-pipeline-{}.gml", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CITY.as_bytes()).unwrap();
    }

    let mut loader = DocumentLoader::open(&path, &with_chunk_size(100)).unwrap();
    assert_eq!(loader.progress().total, CITY.len() as u64);

    let status = loader.run_to_end();
    let _ = std::fs::remove_file(&path);

    assert_eq!(status, LoadStatus::Finished);
    assert_eq!(loader.progress().consumed, CITY.len() as u64);
    assert_eq!(loader.progress().fraction(), 1.0);
    assert_eq!(loader.stats().polygons, 3);

    let (meshes, bounds) = loader.into_parts();
    assert_eq!(meshes.len(), 3);
    assert_eq!(bounds.diagonal(), (8.0f64 * 8.0 + 6.0 * 6.0 + 12.5 * 12.5).sqrt());
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("citygml3d-does-not-exist.gml");
    assert!(DocumentLoader::open(&path, &ViewerConfig::default()).is_err());
}

#[test]
fn test_malformed_document_keeps_partial_mesh() {
    let cut = CITY.find("<bldg:GroundSurface>").unwrap_or(CITY.len());
    let text = format!("{}<gml:Polygon", &CITY[..cut]);

    let context = load_str(&text, &with_chunk_size(16));
    assert!(context.is_closed());
    assert!(context.error().is_some());
    assert_eq!(context.stats().polygons, 2);
    assert_eq!(context.bounds().upper().z, 12.5);
}

#[test]
fn test_invalid_coordinates_follow_policy() {
    let text = CITY.replace("8 6 12.5", "8 six 12.5");

    let nan = load_str(&text, &ViewerConfig::default());
    assert_eq!(nan.stats().invalid_tokens, 1);
    assert!(nan.meshes()[0].triangles.iter().any(|p| p.y.is_nan()));
    // bounds ignore the NaN component
    assert_eq!(nan.bounds().upper().y, 6.0);

    let skip = load_str(
        &text,
        &ViewerConfig {
            numeric_policy: NumericPolicy::SkipPoint,
            ..ViewerConfig::default()
        },
    );
    assert_eq!(skip.meshes()[0].triangles.len(), 3);
    assert!(skip.meshes()[0].triangles.iter().all(|p| p.is_finite()));
}

#[test]
fn test_infinite_token_does_not_move_the_scene() {
    let text = CITY.replace("8 6 12.5", "8 6 inf");

    let context = load_str(&text, &ViewerConfig::default());
    assert_eq!(context.stats().invalid_tokens, 1);
    assert_eq!(context.stats().polygons, 3);
    assert_eq!(context.bounds().upper().to_array(), [8.0, 6.0, 12.5]);
    assert!(context.bounds().center().is_finite());
}
