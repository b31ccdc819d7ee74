use anyhow::{Context, Result};
use pizza_sales::config::PipelineConfig;
use pizza_sales::loader::TableLoader;
use pizza_sales::models::{category, sales, size, Label, Value};
use pizza_sales::processor::{Aggregation, FillPolicy, Predicate, SortKey, Table, TextTransform};
use pizza_sales::report;
use std::env;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "src/configs/pizza_sales.toml";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = PipelineConfig::from_file(&config_path)
        .context("Failed to load pipeline configuration")?;

    info!("🚀 Starting Pizza Sales Pipeline ({})", config_path);
    info!("Reading data from {}", config.data.dir.display());

    let loader = TableLoader::new(&config.data.dir);
    let sales_table = loader
        .load_with_columns(&config.data.sales_file, &sales::REQUIRED)
        .with_context(|| format!("Failed to load sales data: {}", config.data.sales_file))?;
    let sizes = loader
        .load_with_columns(&config.data.size_file, &size::REQUIRED)
        .with_context(|| format!("Failed to load size reference: {}", config.data.size_file))?;
    let categories = loader
        .load_with_columns(&config.data.category_file, &category::REQUIRED)
        .with_context(|| format!("Failed to load category reference: {}", config.data.category_file))?;

    inspect(&sales_table, &config)?;
    select_rows_and_columns(&sales_table, &config)?;
    let sales_table = rebuild_index(&sales_table)?;
    truncate_rows(&sales_table, &config)?;
    let sales_table = filter_rows(&sales_table, &config)?;
    handle_missing_data(&sales_table, &config)?;
    delete_rows_and_columns(&sales_table, &config)?;
    sort_rows(&sales_table, &config)?;
    group_rows(&sales_table, &config)?;

    let merged = merge_references(&sales_table, &sizes, &categories, &config)?;
    concatenate(&sales_table, &loader, &config)?;
    normalize_text(sales_table, &config)?;

    draw_box_plot(&merged, &config)?;

    info!("🎉 Pizza sales pipeline completed successfully!");
    Ok(())
}

fn show(title: &str, table: &Table, rows: usize) {
    info!("{} ({} rows x {} columns)", title, table.height(), table.width());
    println!("{}", table.head(rows));
}

fn inspect(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Inspection ===");
    let rows = config.analysis.preview_rows;
    show("First rows", table, rows);
    println!("{}", table.tail(rows));

    let description = table.describe().context("Failed to describe sales data")?;
    println!("{}", description);

    for column in table.info() {
        println!("{:<20} {:<16} {} non-null", column.name, column.dtype.to_string(), column.non_null);
    }

    for (column, nulls) in table.null_counts() {
        if nulls > 0 {
            warn!("Column {} has {} missing values", column, nulls);
        }
    }

    let duplicates = table.duplicate_count()?;
    if duplicates > 0 {
        warn!("Found {} duplicated rows", duplicates);
    } else {
        info!("✅ No duplicated rows");
    }

    let mismatches = table.price_mismatches(config.analysis.price_tolerance)?;
    if mismatches > 0 {
        warn!("{} rows have total_price != quantity x unit_price", mismatches);
    }
    Ok(())
}

fn select_rows_and_columns(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Selection ===");
    let (start, end) = config.analysis.label_range;
    let (start, end) = (Label::from(start), Label::from(end));

    let quantity = table.column(sales::QUANTITY)?;
    info!("Column {} has {} values", quantity.name(), quantity.len());

    let selected = table.select(&[sales::ORDER_ID, sales::QUANTITY, sales::UNIT_PRICE])?;
    show("Selected columns", &selected, config.analysis.preview_rows);

    let sample = Label::from(config.analysis.sample_label);
    show(&format!("Row {}", sample), &table.loc(&sample)?, 1);
    show("Rows by label", &table.loc_many(&[start.clone(), end.clone()])?, 2);
    show("Label range", &table.loc_range(&start, &end)?, usize::MAX);

    let subset = table.loc_range_select(&start, &end, &[sales::ORDER_ID, sales::QUANTITY, sales::UNIT_PRICE])?;
    show("Label range, selected columns", &subset, usize::MAX);
    Ok(())
}

fn rebuild_index(table: &Table) -> Result<Table> {
    info!("\n=== Indexing ===");
    let indexed = table.set_index(sales::ORDER_DETAILS_ID)?;
    info!("Indexed by {}", indexed.index_name().unwrap_or_default());
    let reset = indexed.reset_index()?;
    info!("Index reset, columns: {:?}", reset.column_names());
    Ok(reset)
}

fn truncate_rows(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Truncation ===");
    let (before, after) = config.analysis.label_range;
    let (before, after) = (Label::from(before), Label::from(after));

    let truncated_before = table.truncate(Some(&before), None)?;
    info!("{} rows from label {} on", truncated_before.height(), before);
    let truncated_after = table.truncate(None, Some(&after))?;
    show(&format!("Rows up to label {}", after), &truncated_after, usize::MAX);

    let quantity = table.column(sales::QUANTITY)?;
    info!("{} quantities from label {} on", quantity.truncate(Some(&before), None)?.len(), before);
    print!("{}", quantity.truncate(None, Some(&after))?);
    Ok(())
}

/// Returns the table with order dates truncated to calendar dates.
fn filter_rows(table: &Table, config: &PipelineConfig) -> Result<Table> {
    info!("\n=== Filtering ===");
    let analysis = &config.analysis;
    let rows = analysis.preview_rows;

    let expensive = table.filter(&Predicate::column(sales::UNIT_PRICE).gt(analysis.price_threshold))?;
    show(&format!("unit_price > {}", analysis.price_threshold), &expensive, rows);

    let table = table.to_date(sales::ORDER_DATE)?;
    let later = table.filter(&Predicate::column(sales::ORDER_DATE).gt(Value::Date(analysis.date_cutoff)))?;
    show(&format!("Orders after {}", analysis.date_cutoff), &later, rows);

    let featured = Predicate::column(sales::PIZZA_NAME).eq(analysis.featured_pizza.as_str());
    let pricier = Predicate::column(sales::UNIT_PRICE).gt(analysis.featured_min_price);

    let both = table.filter(&pricier.clone().and(featured.clone()))?;
    show("Featured pizza above the minimum price", &both, rows);
    let either = table.filter(&pricier.or(featured))?;
    show("Featured pizza or above the minimum price", &either, rows);

    let (low, high) = analysis.price_band;
    let band = Predicate::column(sales::UNIT_PRICE)
        .gt(low)
        .and(Predicate::column(sales::UNIT_PRICE).lt_eq(high));
    show(&format!("{} < unit_price <= {}", low, high), &table.filter(&band)?, rows);

    Ok(table)
}

fn handle_missing_data(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Missing data ===");
    let complete = table.drop_missing()?;
    info!("{} of {} rows have no missing values", complete.height(), table.height());
    let remaining: usize = complete.null_counts().iter().map(|(_, n)| n).sum();
    info!("Missing values after dropping: {}", remaining);

    let policy = FillPolicy::typed_defaults(table, config.analysis.missing_date_fill);
    let filled = table.fill_missing(&policy)?;
    let remaining: usize = filled.null_counts().iter().map(|(_, n)| n).sum();
    info!("Missing values after filling {} columns: {}", policy.len(), remaining);
    Ok(())
}

fn delete_rows_and_columns(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Deletion ===");
    let analysis = &config.analysis;
    let rows = analysis.preview_rows;

    let label = Label::from(analysis.drop_row);
    show(&format!("Without row {}", label), &table.drop_row(&label)?, rows);

    let labels: Vec<Label> = analysis.drop_rows.iter().copied().map(Label::from).collect();
    show(&format!("Without rows {:?}", analysis.drop_rows), &table.drop_rows(&labels)?, rows + labels.len());

    show("Without unit_price", &table.drop_column(sales::UNIT_PRICE)?, rows);
    show(
        &format!("Without {:?}", analysis.drop_columns),
        &table.drop_columns(&config.drop_columns())?,
        rows,
    );
    Ok(())
}

fn sort_rows(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Sorting ===");
    let rows = config.analysis.preview_rows;
    show(
        "By total_price, descending",
        &table.sort_by(&[SortKey::descending(sales::TOTAL_PRICE)])?,
        rows,
    );
    show(
        "By total_price, ascending",
        &table.sort_by(&[SortKey::ascending(sales::TOTAL_PRICE)])?,
        rows,
    );
    show(
        "By category, then total_price descending",
        &table.sort_by(&[
            SortKey::ascending(sales::PIZZA_CATEGORY_ID),
            SortKey::descending(sales::TOTAL_PRICE),
        ])?,
        rows,
    );
    Ok(())
}

fn group_rows(table: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Grouping ===");
    let rows = config.analysis.preview_rows;
    let by_size = table.group_by(&[sales::PIZZA_SIZE_ID])?;

    let counts = by_size.count()?.sort_by(&[SortKey::descending(sales::PIZZA_SIZE_ID)])?;
    show("Rows per size", &counts, rows);

    let sums = by_size
        .sum(&[sales::TOTAL_PRICE])?
        .sort_by(&[SortKey::descending(sales::TOTAL_PRICE)])?;
    show("Revenue per size", &sums, rows);

    show(
        "Revenue and quantity per size",
        &by_size.sum(&[sales::TOTAL_PRICE, sales::QUANTITY])?,
        rows,
    );

    let aggregated = by_size.agg(&[
        (sales::QUANTITY, Aggregation::Sum),
        (sales::TOTAL_PRICE, Aggregation::Mean),
    ])?;
    show("Quantity sum and mean total per size", &aggregated, rows);
    Ok(())
}

fn merge_references(
    table: &Table,
    sizes: &Table,
    categories: &Table,
    config: &PipelineConfig,
) -> Result<Table> {
    info!("\n=== Merging ===");
    let with_sizes = table
        .merge(sizes, size::ID)
        .context("Failed to join size reference")?;
    let with_categories = with_sizes
        .table
        .merge(categories, category::ID)
        .context("Failed to join category reference")?;

    let orphans = with_sizes.orphaned_rows + with_categories.orphaned_rows;
    if orphans == 0 {
        info!("✅ Every sales row matched both reference tables");
    }
    show("Merged sales", &with_categories.table, config.analysis.preview_rows);
    Ok(with_categories.table)
}

fn concatenate(table: &Table, loader: &TableLoader, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Concatenation ===");
    let rows = config.analysis.preview_rows;

    let more_sales = loader
        .load(&config.data.extra_sales_file)
        .with_context(|| format!("Failed to load additional sales: {}", config.data.extra_sales_file))?
        .to_date(sales::ORDER_DATE)?;
    let stacked = table
        .concat_vertical(&more_sales)
        .context("Additional sales do not share the sales schema")?
        .reset_index()?;
    show("Stacked sales", &stacked, rows);

    let vouchers = loader
        .load(&config.data.voucher_file)
        .with_context(|| format!("Failed to load vouchers: {}", config.data.voucher_file))?;
    let widened = table
        .concat_horizontal(&vouchers)
        .context("Vouchers are not aligned with the sales rows")?;
    show("Sales with vouchers", &widened, rows);
    Ok(())
}

fn normalize_text(mut table: Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Text normalization ===");
    let analysis = &config.analysis;
    let transforms = [
        TextTransform::Lowercase,
        TextTransform::Uppercase,
        TextTransform::TitleCase,
        TextTransform::replace(&analysis.replace_ingredient, &analysis.replacement_ingredient),
    ];

    for transform in &transforms {
        let preview = table.transformed_text(sales::PIZZA_INGREDIENTS, transform)?;
        info!("{:?}: {:?}", transform, preview.str()?.get(0));
        table.apply_text(sales::PIZZA_INGREDIENTS, transform)?;
    }
    table.apply_text(sales::PIZZA_NAME, &TextTransform::Trim)?;

    show("Normalized text", &table.select(&[sales::PIZZA_NAME, sales::PIZZA_INGREDIENTS])?, analysis.preview_rows);
    Ok(())
}

fn draw_box_plot(merged: &Table, config: &PipelineConfig) -> Result<()> {
    info!("\n=== Box plot ===");
    let stats = report::category_box_stats(merged, category::LABEL, sales::TOTAL_PRICE)?;
    print!("{}", report::summary(&stats, &config.chart));
    report::render_svg(&stats, &config.chart).context("Failed to render box plot")?;
    Ok(())
}
