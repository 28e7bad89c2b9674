//! Benchmarks for the binary and JSON codecs on a hand-written message.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use protoquill::json::{decode, encode, JsonObject, JsonWriter, Value};
use protoquill::leb128::LebCodec;
use protoquill::{BinaryCodec, DecodeError, EncodeError, JsonCodec, Message, Reader, Writer};

#[derive(Debug, Clone, Default, PartialEq)]
struct PhoneNumber {
    number: String,
    phone_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Person {
    name: String,
    id: i32,
    email: String,
    phones: Vec<PhoneNumber>,
}

impl Message for PhoneNumber {
    const NAME: &'static str = "bench.PhoneNumber";
    type Partial = ();

    fn initialize(_partial: ()) -> Self {
        PhoneNumber::default()
    }
}

impl BinaryCodec for PhoneNumber {
    fn encode_fields(&self, writer: &mut Writer) {
        if !self.number.is_empty() {
            writer.write_string(1, &self.number);
        }
        if self.phone_type != 0 {
            writer.write_int32(2, self.phone_type);
        }
    }

    fn merge_fields(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        while reader.next_field()? {
            match reader.field_number() {
                1 => self.number = reader.read_string()?,
                2 => self.phone_type = reader.read_int32()?,
                _ => reader.skip_field()?,
            }
        }
        Ok(())
    }
}

impl JsonCodec for PhoneNumber {
    fn to_json(&self) -> Result<Value, EncodeError> {
        let mut object = JsonWriter::new();
        if !self.number.is_empty() {
            object.insert("number", encode::string(&self.number));
        }
        if self.phone_type != 0 {
            object.insert("phoneType", encode::int32(self.phone_type));
        }
        Ok(object.finish())
    }

    fn merge_json(&mut self, value: &Value) -> Result<(), DecodeError> {
        let object = JsonObject::new(value)?;
        if let Some(value) = object.get("number", "number")? {
            self.number = decode::string(value)?;
        }
        if let Some(value) = object.get("phoneType", "phone_type")? {
            self.phone_type = decode::int32(value)?;
        }
        Ok(())
    }
}

impl Message for Person {
    const NAME: &'static str = "bench.Person";
    type Partial = ();

    fn initialize(_partial: ()) -> Self {
        Person::default()
    }
}

impl BinaryCodec for Person {
    fn encode_fields(&self, writer: &mut Writer) {
        if !self.name.is_empty() {
            writer.write_string(1, &self.name);
        }
        if self.id != 0 {
            writer.write_int32(2, self.id);
        }
        if !self.email.is_empty() {
            writer.write_string(3, &self.email);
        }
        for phone in &self.phones {
            writer.write_message(4, phone);
        }
    }

    fn merge_fields(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        while reader.next_field()? {
            match reader.field_number() {
                1 => self.name = reader.read_string()?,
                2 => self.id = reader.read_int32()?,
                3 => self.email = reader.read_string()?,
                4 => {
                    let mut phone = PhoneNumber::default();
                    reader.read_message(&mut phone)?;
                    self.phones.push(phone);
                }
                _ => reader.skip_field()?,
            }
        }
        Ok(())
    }
}

impl JsonCodec for Person {
    fn to_json(&self) -> Result<Value, EncodeError> {
        let mut object = JsonWriter::new();
        if !self.name.is_empty() {
            object.insert("name", encode::string(&self.name));
        }
        if self.id != 0 {
            object.insert("id", encode::int32(self.id));
        }
        if !self.email.is_empty() {
            object.insert("email", encode::string(&self.email));
        }
        if !self.phones.is_empty() {
            object.insert("phones", encode::try_array(&self.phones, encode::message)?);
        }
        Ok(object.finish())
    }

    fn merge_json(&mut self, value: &Value) -> Result<(), DecodeError> {
        let object = JsonObject::new(value)?;
        if let Some(value) = object.get("name", "name")? {
            self.name = decode::string(value)?;
        }
        if let Some(value) = object.get("id", "id")? {
            self.id = decode::int32(value)?;
        }
        if let Some(value) = object.get("email", "email")? {
            self.email = decode::string(value)?;
        }
        if let Some(value) = object.get("phones", "phones")? {
            self.phones.extend(decode::array(value, decode::message::<PhoneNumber>)?);
        }
        Ok(())
    }
}

fn create_person(num_phones: usize) -> Person {
    Person {
        name: "Alice Johnson".to_string(),
        id: 12345,
        email: "alice.johnson@example.com".to_string(),
        phones: (0..num_phones)
            .map(|i| PhoneNumber {
                number: format!("555-{:04}", i),
                phone_type: (i % 3) as i32,
            })
            .collect(),
    }
}

fn varint_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");

    for value in [1u64, 300, u64::from(u32::MAX), u64::MAX] {
        let mut encoded = Vec::new();
        value.encode_leb128(&mut encoded);

        group.bench_with_input(BenchmarkId::new("encode", value), &value, |b, value| {
            b.iter(|| {
                let mut buf = Vec::with_capacity(10);
                value.encode_leb128(&mut buf);
                std::hint::black_box(buf)
            })
        });

        group.bench_with_input(BenchmarkId::new("decode", value), &encoded, |b, data| {
            b.iter(|| {
                let decoded = u64::decode_leb128_buf(&mut &data[..]).unwrap();
                std::hint::black_box(decoded)
            })
        });
    }

    group.finish();
}

fn binary_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary");

    for num_phones in [0, 1, 10, 100] {
        let person = create_person(num_phones);
        let encoded = person.encode_binary();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", num_phones), &person, |b, person| {
            b.iter(|| std::hint::black_box(person.encode_binary()))
        });

        group.bench_with_input(BenchmarkId::new("decode", num_phones), &encoded, |b, data| {
            b.iter(|| std::hint::black_box(Person::decode_binary(data).unwrap()))
        });
    }

    group.finish();
}

fn json_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("json");

    for num_phones in [0, 1, 10, 100] {
        let person = create_person(num_phones);
        let encoded = person.encode_json().unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", num_phones), &person, |b, person| {
            b.iter(|| std::hint::black_box(person.encode_json().unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("decode", num_phones), &encoded, |b, text| {
            b.iter(|| std::hint::black_box(Person::decode_json(text).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, varint_benchmark, binary_benchmark, json_benchmark);
criterion_main!(benches);
