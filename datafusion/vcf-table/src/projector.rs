//! Column projection and record decoding.
//!
//! [`BatchAccumulator`] turns streamed variant records into Arrow record
//! batches, decoding only the columns the query projects. INFO and per-sample
//! FORMAT fields are each walked in a single pass per record, with absent
//! fields backfilled as nulls (or `false` for Flag columns). In tidy mode the
//! accumulator explodes each record into one row per sample as it goes, so
//! memory stays bounded by the batch size either way.

use crate::catalog::{SampleLayout, VcfCatalog, CORE_COLUMN_COUNT};
use datafusion::arrow::array::{Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion_vcf_table_core::table_utils::OptionalField;
use noodles::vcf::variant::record::info::field::{value::Array as InfoArray, Value as InfoValue};
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record::samples::series::value::Array as SamplesArray;
use noodles::vcf::variant::record::samples::series::Value as SampleValue;
use noodles::vcf::variant::record::samples::Sample;
use noodles::vcf::variant::record::{AlternateBases, Filters, Ids, ReferenceBases, Samples};
use noodles::vcf::variant::Record;
use noodles::vcf::Header;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

fn invalid<E: std::fmt::Display>(context: &str, e: E) -> ArrowError {
    ArrowError::InvalidArgumentError(format!("{context}: {e}"))
}

/// Renders a genotype value as allele indices joined by the per-allele
/// phasing separator (`|` phased, `/` unphased), `.` for missing alleles.
fn render_genotype(
    gt: &dyn noodles::vcf::variant::record::samples::series::value::Genotype,
) -> String {
    let mut out = String::new();
    let mut first = true;
    for (allele, phasing) in gt.iter().flatten() {
        if !first {
            out.push(match phasing {
                Phasing::Phased => '|',
                Phasing::Unphased => '/',
            });
        }
        first = false;
        match allele {
            Some(index) => {
                let _ = write!(out, "{index}");
            }
            None => out.push('.'),
        }
    }
    out
}

/// Streaming accumulator from variant records to Arrow record batches.
///
/// Builders are sized once from the corrected schema; [`Self::finish`]
/// drains them, so one accumulator serves a whole scan.
pub struct BatchAccumulator {
    schema: SchemaRef,
    projection: Option<Vec<usize>>,
    layout: SampleLayout,
    sample_names: Vec<String>,

    chroms: Vec<String>,
    pos_builder: OptionalField,
    ids: Vec<Option<String>>,
    refs: Vec<String>,
    alt_builder: OptionalField,
    qual_builder: OptionalField,
    filter_builder: OptionalField,

    info_data_types: Vec<DataType>,
    info_builders: Vec<OptionalField>,
    info_name_to_index: HashMap<String, usize>,
    info_populated: Vec<bool>,
    // One flag per builder: unprojected columns must never accumulate.
    info_needed: Vec<bool>,

    format_fields: Vec<String>,
    format_data_types: Vec<DataType>,
    format_builders: Vec<OptionalField>,
    format_field_to_index: HashMap<String, usize>,
    format_populated: Vec<bool>,
    format_needed: Vec<bool>,
    sample_ids: Vec<String>,

    needs_chrom: bool,
    needs_pos: bool,
    needs_id: bool,
    needs_ref: bool,
    needs_alt: bool,
    needs_qual: bool,
    needs_filter: bool,
    needs_sample_id: bool,
    needs_any_info: bool,
    needs_any_format: bool,

    row_count: usize,
}

impl BatchAccumulator {
    /// Creates an accumulator for the catalog's schema, decoding only the
    /// columns named by `projection` (None = all).
    pub fn new(
        catalog: &VcfCatalog,
        projection: Option<Vec<usize>>,
        batch_size: usize,
    ) -> Result<Self, ArrowError> {
        let schema = Arc::clone(&catalog.schema);
        let num_info = catalog.info_fields.len();
        let sample_block_start = CORE_COLUMN_COUNT + num_info;

        let info_data_types: Vec<DataType> = (0..num_info)
            .map(|i| schema.field(CORE_COLUMN_COUNT + i).data_type().clone())
            .collect();
        let info_builders = info_data_types
            .iter()
            .map(|dt| OptionalField::new(dt, batch_size))
            .collect::<Result<Vec<_>, _>>()?;
        let info_name_to_index: HashMap<String, usize> = catalog
            .info_fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let format_fields = match catalog.sample_layout {
            SampleLayout::LegacyGenotype => vec!["GT".to_string()],
            _ => catalog.format_fields.clone(),
        };
        // Wide layouts carry one builder per (sample, field) pair,
        // sample-major to match the schema; tidy carries one per field.
        let format_column_start = match catalog.sample_layout {
            SampleLayout::Tidy => sample_block_start + 1,
            _ => sample_block_start,
        };
        let num_format_columns = schema.fields().len() - format_column_start;
        let format_data_types: Vec<DataType> = (0..num_format_columns)
            .map(|i| schema.field(format_column_start + i).data_type().clone())
            .collect();
        let format_builders = format_data_types
            .iter()
            .map(|dt| OptionalField::new(dt, batch_size))
            .collect::<Result<Vec<_>, _>>()?;
        let format_field_to_index: HashMap<String, usize> = format_fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let needs = |idx: usize| {
            projection
                .as_ref()
                .is_none_or(|p: &Vec<usize>| p.contains(&idx))
        };
        let needs_core: Vec<bool> = (0..CORE_COLUMN_COUNT).map(|i| needs(i)).collect();
        let info_needed: Vec<bool> = (0..num_info)
            .map(|i| needs(CORE_COLUMN_COUNT + i))
            .collect();
        let format_needed: Vec<bool> = (0..num_format_columns)
            .map(|i| needs(format_column_start + i))
            .collect();
        let needs_sample_id =
            catalog.sample_layout == SampleLayout::Tidy && needs(sample_block_start);
        let needs_any_info = info_needed.iter().any(|&b| b);
        let needs_any_format = format_needed.iter().any(|&b| b);

        Ok(BatchAccumulator {
            projection,
            layout: catalog.sample_layout,
            sample_names: catalog.sample_names.clone(),
            chroms: Vec::with_capacity(batch_size),
            pos_builder: OptionalField::new(&DataType::Int64, batch_size)?,
            ids: Vec::with_capacity(batch_size),
            refs: Vec::with_capacity(batch_size),
            alt_builder: OptionalField::new(&list_utf8(), batch_size)?,
            qual_builder: OptionalField::new(&DataType::Float64, batch_size)?,
            filter_builder: OptionalField::new(&list_utf8(), batch_size)?,
            info_data_types,
            info_builders,
            info_name_to_index,
            info_populated: vec![false; num_info],
            info_needed,
            format_fields,
            format_data_types,
            format_builders,
            format_field_to_index,
            format_populated: vec![false; num_format_columns.max(1)],
            format_needed,
            sample_ids: Vec::with_capacity(batch_size),
            needs_chrom: needs_core[0],
            needs_pos: needs_core[1],
            needs_id: needs_core[2],
            needs_ref: needs_core[3],
            needs_alt: needs_core[4],
            needs_qual: needs_core[5],
            needs_filter: needs_core[6],
            needs_sample_id,
            needs_any_info,
            needs_any_format,
            schema,
            row_count: 0,
        })
    }

    /// Number of accumulated output rows.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Returns true when no rows are accumulated.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Decodes one record into the accumulator. Wide layouts add one row;
    /// tidy adds one row per sample.
    pub fn append(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        match self.layout {
            SampleLayout::Tidy => self.append_tidy(header, record),
            _ => self.append_wide(header, record),
        }
    }

    fn append_wide(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        self.append_core(header, record)?;
        if self.needs_any_info {
            self.load_infos(header, record)?;
        }
        if self.needs_any_format && !self.format_builders.is_empty() {
            self.load_all_samples(header, record)?;
        }
        self.row_count += 1;
        Ok(())
    }

    fn append_tidy(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        let samples = record
            .samples()
            .map_err(|e| invalid("reading samples", e))?;
        let sample_count = self.sample_names.len();
        for (sample_idx, sample) in samples.iter().enumerate().take(sample_count) {
            self.append_core(header, record)?;
            if self.needs_any_info {
                self.load_infos(header, record)?;
            }
            if self.needs_sample_id {
                self.sample_ids.push(self.sample_names[sample_idx].clone());
            }
            if self.needs_any_format {
                self.load_one_sample(header, &*sample, 0)?;
            }
            self.row_count += 1;
        }
        Ok(())
    }

    fn append_core(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        if self.needs_chrom {
            let name = record
                .reference_sequence_name(header)
                .map_err(|e| invalid("reading CHROM", e))?;
            self.chroms.push(name.to_string());
        }
        if self.needs_pos {
            let position = record
                .variant_start()
                .ok_or_else(|| invalid("reading POS", "missing position"))?
                .map_err(|e| invalid("reading POS", e))?;
            self.pos_builder.append_int64(position.get() as i64)?;
        }
        if self.needs_id {
            let ids = record.ids();
            if ids.is_empty() {
                self.ids.push(None);
            } else {
                let mut buf = String::new();
                let mut first = true;
                for id in ids.iter() {
                    if !first {
                        buf.push(';');
                    }
                    first = false;
                    buf.push_str(id);
                }
                self.ids.push(Some(buf));
            }
        }
        if self.needs_ref {
            let bases = record
                .reference_bases()
                .iter()
                .collect::<std::io::Result<Vec<u8>>>()
                .map_err(|e| invalid("reading REF", e))?;
            self.refs.push(String::from_utf8_lossy(&bases).into_owned());
        }
        if self.needs_alt {
            let alternate_bases = record.alternate_bases();
            let alts = alternate_bases
                .iter()
                .map(|alt| alt.map(String::from))
                .collect::<std::io::Result<Vec<String>>>()
                .map_err(|e| invalid("reading ALT", e))?;
            self.alt_builder.append_array_string(alts)?;
        }
        if self.needs_qual {
            let qual = record
                .quality_score()
                .transpose()
                .map_err(|e| invalid("reading QUAL", e))?;
            self.qual_builder
                .append_float64_option(qual.map(f64::from))?;
        }
        if self.needs_filter {
            let record_filters = record.filters();
            let filters = record_filters
                .iter(header)
                .map(|f| f.map(String::from))
                .collect::<std::io::Result<Vec<String>>>()
                .map_err(|e| invalid("reading FILTER", e))?;
            self.filter_builder.append_array_string(filters)?;
        }
        Ok(())
    }

    /// Single pass over the record's INFO block; projected fields absent
    /// from the record are backfilled (null, or `false` for flags).
    /// Unprojected columns are skipped entirely.
    fn load_infos(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        if self.info_builders.is_empty() {
            return Ok(());
        }
        self.info_populated.iter_mut().for_each(|v| *v = false);

        let info = record.info();
        for result in info.iter(header) {
            let (key, value) = result.map_err(|e| invalid("reading INFO", e))?;
            let Some(&idx) = self.info_name_to_index.get(key) else {
                continue;
            };
            if !self.info_needed[idx] {
                continue;
            }
            self.info_populated[idx] = true;
            let data_type = &self.info_data_types[idx];
            let builder = &mut self.info_builders[idx];
            append_info_value(builder, data_type, value)?;
        }

        for idx in 0..self.info_builders.len() {
            if self.info_needed[idx] && !self.info_populated[idx] {
                if self.info_data_types[idx] == DataType::Boolean {
                    self.info_builders[idx].append_boolean(false)?;
                } else {
                    self.info_builders[idx].append_null()?;
                }
            }
        }
        Ok(())
    }

    fn load_all_samples(&mut self, header: &Header, record: &dyn Record) -> Result<(), ArrowError> {
        let samples = match record.samples() {
            Ok(s) => s,
            Err(_) => {
                for (idx, builder) in self.format_builders.iter_mut().enumerate() {
                    if self.format_needed[idx] {
                        builder.append_null()?;
                    }
                }
                return Ok(());
            }
        };
        let num_fields = self.format_fields.len();
        let sample_count = self.sample_names.len();
        for (sample_idx, sample) in samples.iter().enumerate().take(sample_count) {
            self.load_one_sample(header, &*sample, sample_idx * num_fields)?;
        }
        Ok(())
    }

    /// Single pass over one sample's FORMAT series, appending into the
    /// builder block starting at `base_builder_idx`.
    fn load_one_sample(
        &mut self,
        header: &Header,
        sample: &dyn Sample,
        base_builder_idx: usize,
    ) -> Result<(), ArrowError> {
        let num_fields = self.format_fields.len();
        if num_fields == 0 {
            return Ok(());
        }
        self.format_populated.iter_mut().for_each(|v| *v = false);

        for result in sample.iter(header) {
            let (key, value) = result.map_err(|e| invalid("reading FORMAT", e))?;
            let Some(&local_idx) = self.format_field_to_index.get(key) else {
                continue;
            };
            let builder_idx = base_builder_idx + local_idx;
            if !self.format_needed[builder_idx] {
                continue;
            }
            self.format_populated[local_idx] = true;
            let data_type = &self.format_data_types[builder_idx];
            let builder = &mut self.format_builders[builder_idx];
            append_sample_value(builder, data_type, key, value)?;
        }

        for local_idx in 0..num_fields {
            let builder_idx = base_builder_idx + local_idx;
            if self.format_needed[builder_idx] && !self.format_populated[local_idx] {
                self.format_builders[builder_idx].append_null()?;
            }
        }
        Ok(())
    }

    /// Drains the accumulator into a record batch honoring the projection.
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let row_count = self.row_count;
        self.row_count = 0;

        let chroms = std::mem::take(&mut self.chroms);
        let ids = std::mem::take(&mut self.ids);
        let refs = std::mem::take(&mut self.refs);
        let sample_ids = std::mem::take(&mut self.sample_ids);

        let make_core = |i: usize,
                         pos: &mut OptionalField,
                         alt: &mut OptionalField,
                         qual: &mut OptionalField,
                         filter: &mut OptionalField|
         -> Arc<dyn Array> {
            match i {
                0 => Arc::new(StringArray::from_iter_values(chroms.iter())),
                1 => pos.finish(),
                2 => Arc::new(ids.iter().cloned().collect::<StringArray>()),
                3 => Arc::new(StringArray::from_iter_values(refs.iter())),
                4 => alt.finish(),
                5 => qual.finish(),
                _ => filter.finish(),
            }
        };

        let num_info = self.info_builders.len();
        let sample_block_start = CORE_COLUMN_COUNT + num_info;
        let tidy = self.layout == SampleLayout::Tidy;

        let mut arrays: Vec<Arc<dyn Array>> = Vec::new();
        match self.projection.clone() {
            None => {
                for i in 0..CORE_COLUMN_COUNT {
                    arrays.push(make_core(
                        i,
                        &mut self.pos_builder,
                        &mut self.alt_builder,
                        &mut self.qual_builder,
                        &mut self.filter_builder,
                    ));
                }
                for builder in self.info_builders.iter_mut() {
                    arrays.push(builder.finish());
                }
                if tidy {
                    arrays.push(Arc::new(StringArray::from_iter_values(sample_ids.iter())));
                }
                for builder in self.format_builders.iter_mut() {
                    arrays.push(builder.finish());
                }
            }
            Some(indices) => {
                for &i in &indices {
                    let array: Arc<dyn Array> = if i < CORE_COLUMN_COUNT {
                        make_core(
                            i,
                            &mut self.pos_builder,
                            &mut self.alt_builder,
                            &mut self.qual_builder,
                            &mut self.filter_builder,
                        )
                    } else if i < sample_block_start {
                        self.info_builders[i - CORE_COLUMN_COUNT].finish()
                    } else if tidy && i == sample_block_start {
                        Arc::new(StringArray::from_iter_values(sample_ids.iter()))
                    } else {
                        let offset = if tidy {
                            sample_block_start + 1
                        } else {
                            sample_block_start
                        };
                        self.format_builders[i - offset].finish()
                    };
                    arrays.push(array);
                }
            }
        }

        let schema = projected_schema(&self.schema, self.projection.as_ref());
        if arrays.is_empty() {
            // COUNT(*) projection: no columns, rows counted via options.
            let options = RecordBatchOptions::new().with_row_count(Some(row_count));
            RecordBatch::try_new_with_options(schema, arrays, &options)
        } else {
            RecordBatch::try_new(schema, arrays)
        }
    }
}

/// Projects `schema`, preserving metadata even for the empty (`COUNT(*)`)
/// projection.
pub fn projected_schema(schema: &SchemaRef, projection: Option<&Vec<usize>>) -> SchemaRef {
    use datafusion::arrow::datatypes::{Field, Schema};
    match projection {
        None => Arc::clone(schema),
        Some(indices) => {
            let fields: Vec<Field> = indices
                .iter()
                .map(|&i| schema.field(i).clone())
                .collect();
            Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()))
        }
    }
}

fn list_utf8() -> DataType {
    use datafusion::arrow::datatypes::Field;
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

fn append_info_value(
    builder: &mut OptionalField,
    data_type: &DataType,
    value: Option<InfoValue<'_>>,
) -> Result<(), ArrowError> {
    match value {
        Some(InfoValue::Integer(v)) => builder.append_int(v),
        Some(InfoValue::Float(v)) => builder.append_float(v),
        Some(InfoValue::Flag) => builder.append_boolean(true),
        Some(InfoValue::Character(c)) => builder.append_string(&c.to_string()),
        Some(InfoValue::String(v)) => builder.append_string(&v),
        Some(InfoValue::Array(array)) => append_info_array(builder, data_type, array),
        None => {
            // Key-only occurrence: true for flags, null otherwise.
            if data_type == &DataType::Boolean {
                builder.append_boolean(true)
            } else {
                builder.append_null()
            }
        }
    }
}

fn append_info_array(
    builder: &mut OptionalField,
    data_type: &DataType,
    array: InfoArray<'_>,
) -> Result<(), ArrowError> {
    match array {
        InfoArray::Integer(values) => {
            let ints: Vec<Option<i32>> = values.iter().map(|v| v.ok().flatten()).collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Int32,
                ints,
                |b, v| b.append_int(v),
                |b, vs| b.append_array_int_nullable(vs),
            )
        }
        InfoArray::Float(values) => {
            let floats: Vec<Option<f32>> = values.iter().map(|v| v.ok().flatten()).collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Float32,
                floats,
                |b, v| b.append_float(v),
                |b, vs| b.append_array_float_nullable(vs),
            )
        }
        InfoArray::String(values) => {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| v.ok().flatten().map(|s| s.to_string()))
                .collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Utf8,
                strings,
                |b, v| b.append_string(&v),
                |b, vs| b.append_array_string_nullable(vs),
            )
        }
        InfoArray::Character(values) => {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| v.ok().flatten().map(|c| c.to_string()))
                .collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Utf8,
                strings,
                |b, v| b.append_string(&v),
                |b, vs| b.append_array_string_nullable(vs),
            )
        }
    }
}

fn append_sample_value(
    builder: &mut OptionalField,
    data_type: &DataType,
    key: &str,
    value: Option<SampleValue<'_>>,
) -> Result<(), ArrowError> {
    // GT renders as a genotype string regardless of how it was stored.
    if key == "GT" {
        return match value {
            Some(SampleValue::Genotype(gt)) => builder.append_string(&render_genotype(&*gt)),
            Some(SampleValue::String(s)) => builder.append_string(&s),
            _ => builder.append_null(),
        };
    }
    match value {
        Some(SampleValue::Integer(v)) => builder.append_int(v),
        Some(SampleValue::Float(v)) => builder.append_float(v),
        Some(SampleValue::String(v)) => builder.append_string(&v),
        Some(SampleValue::Character(c)) => builder.append_string(&c.to_string()),
        Some(SampleValue::Array(array)) => append_sample_array(builder, data_type, array),
        Some(SampleValue::Genotype(gt)) => builder.append_string(&render_genotype(&*gt)),
        None => builder.append_null(),
    }
}

fn append_sample_array(
    builder: &mut OptionalField,
    data_type: &DataType,
    array: SamplesArray<'_>,
) -> Result<(), ArrowError> {
    match array {
        SamplesArray::Integer(values) => {
            let ints: Vec<Option<i32>> = values.iter().map(|v| v.ok().flatten()).collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Int32,
                ints,
                |b, v| b.append_int(v),
                |b, vs| b.append_array_int_nullable(vs),
            )
        }
        SamplesArray::Float(values) => {
            let floats: Vec<Option<f32>> = values.iter().map(|v| v.ok().flatten()).collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Float32,
                floats,
                |b, v| b.append_float(v),
                |b, vs| b.append_array_float_nullable(vs),
            )
        }
        SamplesArray::String(values) => {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| v.ok().flatten().map(|s| s.to_string()))
                .collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Utf8,
                strings,
                |b, v| b.append_string(&v),
                |b, vs| b.append_array_string_nullable(vs),
            )
        }
        SamplesArray::Character(values) => {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| v.ok().flatten().map(|c| c.to_string()))
                .collect();
            scalar_or_list(
                builder,
                data_type,
                &DataType::Utf8,
                strings,
                |b, v| b.append_string(&v),
                |b, vs| b.append_array_string_nullable(vs),
            )
        }
    }
}

/// Reconciles an array value against the column type. All-null arrays become
/// a null; a scalar column declared on a multi-valued record takes the first
/// non-null value; list columns preserve inner nulls for allele alignment.
fn scalar_or_list<T: Clone>(
    builder: &mut OptionalField,
    data_type: &DataType,
    scalar_type: &DataType,
    values: Vec<Option<T>>,
    append_scalar: impl FnOnce(&mut OptionalField, T) -> Result<(), ArrowError>,
    append_list: impl FnOnce(&mut OptionalField, Vec<Option<T>>) -> Result<(), ArrowError>,
) -> Result<(), ArrowError> {
    if values.iter().all(|v| v.is_none()) {
        return builder.append_null();
    }
    if data_type == scalar_type {
        match values.into_iter().flatten().next() {
            Some(first) => append_scalar(builder, first),
            None => builder.append_null(),
        }
    } else {
        append_list(builder, values)
    }
}
