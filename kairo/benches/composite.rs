use anyhow::Result as AnyResult;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kairo::{Color, Context, Format, ImageSurface, Pattern, SurfaceRef};
use std::{f64::consts::PI, rc::Rc};

const SIZE: i32 = 256;

fn target() -> SurfaceRef {
    ImageSurface::create(Format::Argb32, SIZE, SIZE)
}

/// Fill a disc clipped to an inner circle, forcing the mask clip path.
fn draw(source: &Rc<Pattern>, clipped: bool) -> AnyResult<SurfaceRef> {
    let s = target();
    let mut ctx = Context::new(&s);
    if clipped {
        ctx.arc(128.0, 128.0, 100.0, 0.0, 2.0 * PI)?;
        ctx.clip()?;
    }
    ctx.set_source(source)?;
    ctx.arc(128.0, 128.0, 120.0, 0.0, 2.0 * PI)?;
    ctx.fill()?;
    Ok(s)
}

fn gradient() -> AnyResult<Rc<Pattern>> {
    let mut p = Pattern::linear(0.0, 0.0, SIZE as f64, SIZE as f64);
    p.add_color_stop(0.0, Color::rgb(1.0, 0.0, 0.0))?;
    p.add_color_stop(1.0, Color::rgb(0.0, 0.0, 1.0))?;
    Ok(Rc::new(p))
}

pub fn solid(c: &mut Criterion) {
    let source = Rc::new(Pattern::rgba(0.2, 0.4, 0.8, 0.9));
    c.bench_function("solid fill", |b| {
        b.iter(|| draw(black_box(&source), false).unwrap())
    });
    c.bench_function("solid fill, mask clip", |b| {
        b.iter(|| draw(black_box(&source), true).unwrap())
    });
}

pub fn linear(c: &mut Criterion) {
    let source = gradient().unwrap();
    c.bench_function("gradient fill", |b| {
        b.iter(|| draw(black_box(&source), false).unwrap())
    });
    c.bench_function("gradient paint", |b| {
        b.iter(|| {
            let s = target();
            let mut ctx = Context::new(&s);
            ctx.set_source(&source).unwrap();
            ctx.paint().unwrap();
            s
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = solid, linear
}

criterion_main!(benches);
