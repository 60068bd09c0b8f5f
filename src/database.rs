use log::info;
use sqlx::{postgres::PgPoolOptions, PgPool, Pool, Postgres};

pub type Database = Pool<Postgres>;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL DEFAULT '',
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        parent_id UUID REFERENCES categories(id) ON DELETE CASCADE,
        product_type TEXT NOT NULL DEFAULT 'all'
            CHECK (product_type IN ('all', 'tshirt', 'jewellery')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_type TEXT NOT NULL CHECK (product_type IN ('tshirt', 'jewellery')),
        category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        original_price NUMERIC(10,2) NOT NULL CHECK (original_price >= 0),
        sale_price NUMERIC(10,2) CHECK (sale_price >= 0),
        stock INT NOT NULL DEFAULT 0 CHECK (stock >= 0),
        is_variable BOOLEAN NOT NULL DEFAULT FALSE,
        images JSONB NOT NULL DEFAULT '[]',
        pricing JSONB,
        badge TEXT,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS product_variants (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        position INT NOT NULL,
        color TEXT,
        size TEXT,
        gsm TEXT,
        price NUMERIC(10,2) NOT NULL CHECK (price > 0),
        stock INT NOT NULL DEFAULT 0 CHECK (stock >= 0),
        image TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS product_variants_product_idx
        ON product_variants (product_id, position)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS promo_codes (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        code TEXT NOT NULL UNIQUE,
        discount_type TEXT NOT NULL CHECK (discount_type IN ('percent', 'flat')),
        discount_value NUMERIC(10,2) NOT NULL CHECK (discount_value > 0),
        min_order NUMERIC(10,2) NOT NULL DEFAULT 0,
        max_uses INT,
        used_count INT NOT NULL DEFAULT 0,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        expires_at DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CHECK (max_uses IS NULL OR used_count <= max_uses)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID REFERENCES users(id) ON DELETE SET NULL,
        product_type TEXT NOT NULL DEFAULT 'mixed'
            CHECK (product_type IN ('tshirt', 'jewellery', 'mixed')),
        items JSONB NOT NULL,
        subtotal NUMERIC(10,2) NOT NULL,
        discount NUMERIC(10,2) NOT NULL DEFAULT 0 CHECK (discount >= 0),
        total NUMERIC(10,2) NOT NULL CHECK (total >= 0),
        promo_code TEXT,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'confirmed', 'shipped', 'delivered', 'cancelled')),
        customer_name TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        customer_phone TEXT,
        customer_address TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    info!("Connected to database successfully");
    Ok(pool)
}

/// Creates any missing tables. Safe to run on every start.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}
