use dimarray::{
    read_npy, reference_array, write_npy, AnyArray, Array, Buffer, Error, ExternalArray, Index,
    NpzReader, NpzWriter, ReadNpyExt, ReferenceBuffer, Scalar, Shape, Slice, Values, ViewNpyExt,
};
use memmap2::MmapMut;
use proptest::prelude::*;
use std::fs::{File, OpenOptions};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shapes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..8, 1..5)
}

proptest! {
    #[test]
    fn offset_index_round_trip(dims in shapes()) {
        let shape = Shape::from(dims);
        let mut index = Index::new();
        for offset in 0..shape.size() {
            shape.index(offset, &mut index).unwrap();
            prop_assert_eq!(shape.offset(&index).unwrap(), offset);
        }
        prop_assert_eq!(
            shape.index(shape.size(), &mut index),
            Err(Error::IndexOutOfRange { index: shape.size(), len: shape.size() })
        );
    }

    #[test]
    fn size_is_product_of_dims(dims in prop::collection::vec(0usize..6, 0..5)) {
        let shape = Shape::from(dims.clone());
        let expected = if dims.is_empty() { 0 } else { dims.iter().product() };
        prop_assert_eq!(shape.size(), expected);
    }

    #[test]
    fn resize_keeps_prefix(values in prop::collection::vec(any::<usize>(), 0..8), rank in 0usize..12) {
        let mut index = Index::from(values.clone());
        index.set_rank(rank);
        prop_assert_eq!(index.rank(), rank);
        for i in 0..rank {
            prop_assert_eq!(index.get(i).unwrap(), values.get(i).copied().unwrap_or(0));
        }

        let mut shape = Shape::from(values.clone());
        shape.set_rank(rank);
        let kept = rank.min(values.len());
        prop_assert_eq!(&shape.dims()[..kept], &values[..kept]);
        prop_assert!(shape.dims()[kept..].iter().all(|&d| d == 0));
    }

    #[test]
    fn equality_is_rank_and_values(a in prop::collection::vec(0usize..3, 0..4), b in prop::collection::vec(0usize..3, 0..4)) {
        prop_assert_eq!(Shape::from(a.clone()) == Shape::from(b.clone()), a == b);
        prop_assert_eq!(Index::from(a.clone()) == Index::from(b.clone()), a == b);
    }
}

#[test]
fn offset_of_coordinates() {
    let shape = Shape::from([6, 9]);
    assert_eq!(shape.offset(&Index::from([3, 4])), Ok(31));
}

#[test]
fn coordinates_of_offset() {
    let shape = Shape::from([6, 9]);
    let mut index = Index::new();
    shape.index(16, &mut index).unwrap();
    assert_eq!(index, Index::from([1, 7]));
    assert_eq!(index.to_string(), "Index (2) [1 7]");
}

#[test]
fn buffer_length_must_match_shape() {
    let mut array = Array::<f64>::new();
    array.set_shape(Shape::from([10]));
    assert_eq!(
        array.set_buffer(Buffer::new(2)),
        Err(Error::SizeMismatch { expected: 10, found: 2 })
    );
    assert_eq!(array.set_buffer(Buffer::new(10)), Ok(()));
}

#[test]
fn ranged_read_of_index() {
    let shape = Shape::from([100, 1024]);
    assert_eq!(shape.to_string(), "Shape(2) [100 1024]");
    let mut index = Index::new();
    index.set_rank(10);
    index.set_range(Slice::from(0..10), Values::Each((1..=10).rev().collect())).unwrap();
    assert_eq!(index.get_range(Slice::from(1..4)), Ok(vec![9, 8, 7]));
    assert_eq!(index.get_range(Slice::new(0, 10, 4)), Ok(vec![10, 6, 2]));
}

#[test]
fn unknown_kind_constructs_nothing() {
    let mut memory = [0xAAu8; 8];
    let external = ExternalArray { dtype: "bool", shape: vec![8], data: &mut memory };
    assert_eq!(
        reference_array(external, "flags", "", "").unwrap_err(),
        Error::UnsupportedElementType("bool".to_string())
    );
    assert_eq!(memory, [0xAA; 8]);
}

#[test]
fn shared_memory_between_arrays() {
    let mut memory = vec![0i32; 4];
    let mut array = Array::from_parts(
        Shape::from([2, 2]),
        ReferenceBuffer::new(&mut memory),
        "m",
        "",
        "",
    )
    .unwrap();
    array.set(&Index::from([1, 1]), 8).unwrap();
    let owned = Buffer::from(vec![0, 0, 0, 8]);
    assert_eq!(array.buffer().unwrap(), &dimarray::Storage::from(owned));
    drop(array);
    assert_eq!(memory, [0, 0, 0, 8]);

    let mut value = 0.5f32;
    Scalar::from_reference(&mut value, "t", "s", "").set_value(1.5);
    assert_eq!(value, 1.5);
}

#[test]
fn npy_file_round_trip() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.npy");

    let mut frame = Array::<i64>::with_shape(Shape::from([3, 4])).unwrap();
    frame.set_range(Slice::new(0, 12, 5), Values::Broadcast(-1)).unwrap();
    write_npy(&path, &frame).unwrap();

    let read: AnyArray<'static> = read_npy(&path).unwrap();
    assert_eq!(read.shape(), &Shape::from([3, 4]));
    let read = read.downcast_ref::<i64>().unwrap();
    assert_eq!(read.as_slice().unwrap(), frame.as_slice().unwrap());

    let typed: Array<'static, i64> = read_npy(&path).unwrap();
    assert_eq!(typed.get(&Index::from([2, 2])), Ok(-1));
}

#[test]
fn memory_mapped_view_writes_through() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapped.npy");
    write_npy(&path, &Array::<f32>::with_shape(Shape::from([2, 3])).unwrap()).unwrap();

    {
        let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let mut mmap = unsafe { MmapMut::map_mut(&file).unwrap() };
        let mut view = AnyArray::view_npy(&mut mmap).unwrap();
        assert!(view.is_reference());
        let array = view.downcast_mut::<f32>().unwrap();
        array.set(&Index::from([1, 2]), 2.5).unwrap();
        array.set_name("mapped");
        assert_eq!(array.to_string(), "mapped = [0 0 0 0 0 2.5] ()");
        drop(view);
        mmap.flush().unwrap();
    }

    let read = Array::<f32>::read_npy(File::open(&path).unwrap()).unwrap();
    assert_eq!(read.get_linear(5), Ok(2.5));
}

#[test]
fn npz_archive_on_disk() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.npz");

    let mut counts = Array::<u8>::with_shape(Shape::from([4])).unwrap();
    counts.set_name("counts");
    counts.fill(200).unwrap();
    let mut energy = Array::<f64>::with_shape(Shape::from([2])).unwrap();
    energy.set_name("energy");

    let mut npz = NpzWriter::new_compressed(File::create(&path).unwrap());
    npz.add_array(&counts).unwrap();
    npz.add_array(&energy).unwrap();
    npz.finish().unwrap();

    let mut npz = NpzReader::new(File::open(&path).unwrap()).unwrap();
    assert_eq!(npz.names().unwrap(), ["counts", "energy"]);
    let counts = npz.by_name("counts").unwrap();
    assert_eq!(counts.to_string(), "counts = [200 200 200 200] ()");
}
