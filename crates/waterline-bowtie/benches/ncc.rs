use criterion::{black_box, criterion_group, criterion_main, Criterion};
use waterline_bowtie::{center_index, BowtieTemplateBank};
use waterline_core::{GrayImage, GridSize, ImageSize};

const DIM: usize = 40;

fn synthetic_target(size: ImageSize, bank: &BowtieTemplateBank) -> GrayImage {
    let mut img = GrayImage::from_fn(size.width, size.height, |x, y| {
        (200 + ((x * 7 + y * 13) % 17)) as u8
    });
    let tpl = bank.template(center_index()).expect("template");
    for row in 0..4 {
        for col in 0..2 {
            let cx = 60 + col * 160;
            let cy = 50 + row * 70;
            img.paste(&tpl, cx - DIM as i32 / 2, cy - DIM as i32 / 2);
        }
    }
    img
}

fn bench_match(c: &mut Criterion) {
    let size = ImageSize::new(320, 320);
    let mut bank = BowtieTemplateBank::default();
    bank.init(DIM, size).expect("init");
    let img = synthetic_target(size, &bank);

    c.bench_function("match_template_320", |b| {
        b.iter(|| {
            let found = bank
                .match_template(center_index(), black_box(&img.view()), 0.5, 16)
                .expect("match");
            black_box(found)
        })
    });

    c.bench_function("find_targets_2x4", |b| {
        b.iter(|| {
            let grid = bank
                .find_targets(black_box(&img.view()), 0.4, GridSize::new(2, 4))
                .expect("grid");
            black_box(grid)
        })
    });
}

criterion_group!(ncc, bench_match);
criterion_main!(ncc);
