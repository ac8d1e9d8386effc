use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use image::{Rgb, RgbImage};
use sealion_dots::{
    Category, ChunkMode, CountTable, ImagePaths, LabeledPoint, SeaLionConfig, SeaLionData,
    SeaLionError,
};

const SCENE: Rgb<u8> = Rgb([200, 190, 180]);
const ANIMAL: Rgb<u8> = Rgb([30, 30, 30]);
const RED: Rgb<u8> = Rgb([243, 8, 5]);

fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, color);
        }
    }
}

/// 600x480 scene with one animal, a red dot beside it, and a painted-over
/// corner in the annotated copy.
fn scene_pair() -> (RgbImage, RgbImage) {
    let mut source = RgbImage::from_pixel(600, 480, SCENE);
    fill(&mut source, 304, 230, 20, 20, ANIMAL);
    let mut annotated = source.clone();
    fill(&mut annotated, 298, 238, 5, 5, RED);
    fill(&mut annotated, 0, 0, 100, 100, Rgb([0, 0, 0]));
    (source, annotated)
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config: SeaLionConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::create_dir_all(root.join("train")).unwrap();
    fs::create_dir_all(root.join("dotted")).unwrap();

    let (source, annotated) = scene_pair();
    source.save(root.join("train/0.png")).unwrap();
    annotated.save(root.join("dotted/0.png")).unwrap();

    // id 1: the annotated copy belongs to a different photograph
    RgbImage::from_pixel(600, 480, Rgb([20, 20, 20]))
        .save(root.join("train/1.png"))
        .unwrap();
    RgbImage::from_pixel(600, 480, Rgb([220, 220, 220]))
        .save(root.join("dotted/1.png"))
        .unwrap();

    fs::write(
        root.join("train.csv"),
        "train_id,adult_males,subadult_males,adult_females,juveniles,pups\n0,1,0,0,0,0\n",
    )
    .unwrap();

    let template = |sub: &str| root.join(sub).join("{id}.png").to_string_lossy().into_owned();
    let config = SeaLionConfig {
        images: ImagePaths {
            source: template("train"),
            annotated: template("dotted"),
            test: template("test"),
        },
        counts_path: root.join("train.csv"),
        coords_path: root.join("out/coords.csv"),
        chunks_dir: root.join("out/chunks"),
        cropped_chunks_dir: root.join("out/croppedchunks"),
        seed: 11,
        ..SeaLionConfig::default()
    };
    Fixture {
        _dir: dir,
        root,
        config,
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn extracts_dot_and_one_background_sample() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());

    let dots = data.dots(0).unwrap().expect("usable pair");
    assert_eq!(dots, vec![LabeledPoint::new(0, Category::AdultMale, 300, 240)]);

    let mut rng = data.rng_for(0);
    let points = data.coords(0, &mut rng).unwrap().expect("usable pair");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0], dots[0]);

    let bg = points[1];
    assert_eq!(bg.category, Category::Background);
    assert_eq!((bg.x % 120, bg.y % 120), (0, 0));
    // painted-over corner tile and tiles next to the dot are never sampled
    assert_ne!((bg.x, bg.y), (0, 0));
    assert!(!((bg.x - 300).abs() < 120 && (bg.y - 240).abs() < 120));
}

#[test]
fn misaligned_pair_is_unusable_not_an_error() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    assert!(data.dots(1).unwrap().is_none());
}

#[test]
fn missing_image_is_not_found() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    let err = data.dots(2).unwrap_err();
    assert!(matches!(err, SeaLionError::ImageNotFound { .. }), "{err}");
}

#[test]
fn batch_run_saves_coords_and_reports() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    let truth = CountTable::load(fx.root.join("train.csv")).unwrap();

    let summary = data.save_coords(&[0, 1, 2], Some(&truth)).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.unusable, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.points, 2);
    assert_relative_eq!(summary.rmse.unwrap(), 0.0);

    let text = fs::read_to_string(&fx.config.coords_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("image_id,category,x,y"));
    assert_eq!(lines.next(), Some("0,0,300,240"));
    assert!(lines.next().unwrap().starts_with("0,5,"));
    assert_eq!(lines.next(), None);

    let loaded = data.load_coords().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0], LabeledPoint::new(0, Category::AdultMale, 300, 240));
}

#[test]
fn same_seed_gives_same_coords() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    let (a, _) = data.collect_coords(&[0], None).unwrap();
    let (b, _) = data.collect_coords(&[0], None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fixed_chunks_are_square_and_named_by_point() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    let bg = LabeledPoint::new(0, Category::Background, 360, 0);
    let points = [LabeledPoint::new(0, Category::AdultMale, 300, 240), bg];

    let summary = data.save_chunks(&points, ChunkMode::Fixed).unwrap();
    assert_eq!(summary.written, 2);

    let names = file_names(&fx.config.chunks_dir);
    assert_eq!(
        names,
        vec!["chunk_0_0_300_240_128.png", "chunk_0_5_360_0_128.png"]
    );
    let chunk = image::open(fx.config.chunks_dir.join("chunk_0_0_300_240_128.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(chunk.dimensions(), (128, 128));
    // the window is centered on the dot; the source copy has no dot
    assert_eq!(*chunk.get_pixel(64, 64), SCENE);
    // the animal sits 4..24 px right of the dot
    assert_eq!(*chunk.get_pixel(64 + 14, 64), ANIMAL);
}

#[test]
fn cropped_chunks_tighten_to_the_animal() {
    let fx = fixture();
    let data = SeaLionData::new(fx.config.clone());
    let points = [
        LabeledPoint::new(0, Category::AdultMale, 300, 240),
        LabeledPoint::new(0, Category::Background, 360, 0),
        // nothing to crop around here
        LabeledPoint::new(0, Category::Pup, 500, 400),
        // image 3 does not exist
        LabeledPoint::new(3, Category::Pup, 10, 10),
    ];

    let summary = data.save_chunks(&points, ChunkMode::Cropped).unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);

    let names = file_names(&fx.config.cropped_chunks_dir);
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"chunk_0_5_360_0_128_128.png".to_string()));

    let animal = names
        .iter()
        .find(|n| n.starts_with("chunk_0_0_"))
        .expect("animal chunk");
    let fields: Vec<i64> = animal
        .trim_end_matches(".png")
        .split('_')
        .skip(1)
        .map(|f| f.parse().unwrap())
        .collect();
    let (x, y, w, h) = (fields[2], fields[3], fields[4], fields[5]);
    assert!((x - 314).abs() <= 2, "{animal}");
    assert!((y - 240).abs() <= 2, "{animal}");
    assert!((15..=32).contains(&w) && (15..=32).contains(&h), "{animal}");

    let img = image::open(fx.config.cropped_chunks_dir.join(animal))
        .unwrap()
        .to_rgb8();
    assert_eq!(img.dimensions(), (w as u32, h as u32));
}

#[cfg(unix)]
#[test]
fn unreadable_image_is_skipped_in_batch() {
    use std::os::unix::fs::PermissionsExt;

    let fx = fixture();
    let locked = fx.root.join("dotted/1.png");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // file modes are not enforced for this user
        return;
    }

    let data = SeaLionData::new(fx.config.clone());
    let err = data.dots(1).unwrap_err();
    assert!(matches!(err, SeaLionError::ImageUnreadable { .. }), "{err}");

    let (points, summary) = data.collect_coords(&[0, 1], None).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(points.len(), 2);

    let chunks = data
        .save_chunks(
            &[
                LabeledPoint::new(1, Category::Pup, 200, 200),
                LabeledPoint::new(0, Category::AdultMale, 300, 240),
            ],
            ChunkMode::Fixed,
        )
        .unwrap();
    assert_eq!(chunks.written, 1);
    assert_eq!(chunks.failed, 1);
}
